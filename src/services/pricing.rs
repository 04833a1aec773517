use crate::models::Price;
use crate::services::pokemon_tcg::{TcgCard, TcgPlayerPrice};
use crate::services::tcgdex::TcgdexCard;

/// TCGplayer variants in the order they are preferred.
const TCGPLAYER_VARIANTS: &[&str] = &[
    "holofoil",
    "normal",
    "reverseHolofoil",
    "1stEditionHolofoil",
    "1stEditionNormal",
    "unlimitedHolofoil",
];

/// The same variants as TCGdex spells them.
const TCGDEX_TCGPLAYER_VARIANTS: &[&str] = &[
    "holofoil",
    "normal",
    "reverse-holofoil",
    "1st-edition-holofoil",
    "1st-edition-normal",
    "unlimited-holofoil",
];

fn usable(amount: Option<f64>) -> Option<f64> {
    amount.filter(|a| a.is_finite() && *a > 0.0)
}

fn price(amount: f64, currency: &str, source: &str, variant: Option<&str>) -> Price {
    Price {
        amount,
        currency: currency.to_string(),
        source: source.to_string(),
        variant: variant.map(str::to_string),
    }
}

fn tcgplayer_amount(p: &TcgPlayerPrice) -> Option<f64> {
    usable(p.market)
        .or_else(|| usable(p.mid))
        .or_else(|| usable(p.low))
}

/// Market price of a Pokemon TCG API card: TCGplayer (USD) first, Cardmarket (EUR) second.
pub fn price_from_tcg_card(card: &TcgCard) -> Option<Price> {
    if let Some(tcgplayer) = &card.tcgplayer {
        let preferred = TCGPLAYER_VARIANTS
            .iter()
            .filter_map(|variant| tcgplayer.prices.get(*variant).map(|p| (*variant, p)));

        // remaining variants in a stable order
        let mut others: Vec<(&str, &TcgPlayerPrice)> = tcgplayer
            .prices
            .iter()
            .filter(|(k, _)| !TCGPLAYER_VARIANTS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        others.sort_by(|a, b| a.0.cmp(b.0));

        for (variant, p) in preferred.chain(others) {
            if let Some(amount) = tcgplayer_amount(p) {
                return Some(price(amount, "USD", "tcgplayer", Some(variant)));
            }
        }
    }

    let prices = card.cardmarket.as_ref()?.prices.as_ref()?;
    usable(prices.average_sell_price)
        .or_else(|| usable(prices.trend_price))
        .map(|amount| price(amount, "EUR", "cardmarket", None))
}

/// Market price of a TCGdex card: Cardmarket (EUR) first, TCGplayer (USD) second.
pub fn price_from_tcgdex_card(card: &TcgdexCard) -> Option<Price> {
    let pricing = card.pricing.as_ref()?;

    if let Some(cm) = &pricing.cardmarket {
        if let Some(amount) = usable(cm.avg).or_else(|| usable(cm.trend)) {
            let currency = cm.unit.as_deref().unwrap_or("EUR");
            return Some(price(amount, currency, "tcgdex", Some("cardmarket")));
        }
    }

    let tcgplayer = pricing.tcgplayer.as_ref()?;
    TCGDEX_TCGPLAYER_VARIANTS
        .iter()
        .find_map(|variant| {
            let amount = tcgplayer.get(*variant)?.get("marketPrice")?.as_f64();
            usable(amount).map(|a| price(a, "USD", "tcgdex", Some(*variant)))
        })
}
