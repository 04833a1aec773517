//! Matches a detected card against the card catalogs.
//!
//! Vision output is unreliable: names lose suffixes, set names are paraphrased
//! and collector numbers are misread. Lookups therefore run from the most
//! specific query to the loosest one and stop at the first usable record.

use std::sync::Arc;

use crate::models::{CardSet, DetectedCard, MatchStage, ResolvedCard};
use crate::services::normalize::{
    base_name, lucene_quote, lucene_wildcard_term, names_agree, normalize_name, numbers_match,
    CollectorNumber,
};
use crate::services::pokemon_tcg::{CardOrder, PokemonTcgClient, TcgCard};
use crate::services::pricing::{price_from_tcg_card, price_from_tcgdex_card};
use crate::services::set_cache::{find_set, sets_with_printed_total, SetCache};
use crate::services::tcgdex::{high_quality_image, TcgdexCardBrief, TcgdexClient};

const NARROW_PAGE_SIZE: u32 = 10;
const WIDE_PAGE_SIZE: u32 = 50;

/// What is known about a detected card once its set and number are parsed.
struct MatchContext<'a> {
    detected: &'a DetectedCard,
    number: Option<CollectorNumber>,
    set: Option<CardSet>,
}

impl MatchContext<'_> {
    fn printed_total(&self) -> Option<u32> {
        self.number.as_ref().and_then(|n| n.printed_total)
    }

    fn score(&self, card: &TcgCard) -> u32 {
        let mut score = 0;

        if normalize_name(&card.name) == normalize_name(&self.detected.name) {
            score += 4;
        } else if base_name(&card.name) == base_name(&self.detected.name) {
            score += 3;
        } else if names_agree(&card.name, &self.detected.name) {
            score += 2;
        }

        if let Some(number) = &self.number {
            if numbers_match(&card.number, &number.number) {
                score += 2;
            }
        }

        if let Some(total) = self.printed_total() {
            if card.set.printed_total == Some(total) {
                score += 2;
            }
        }

        if let Some(set) = &self.set {
            if set.id == card.set.id {
                score += 3;
            }
        }

        score
    }

    /// Highest scoring card; ties keep the catalog's order.
    fn best<'c>(&self, cards: &'c [TcgCard]) -> Option<&'c TcgCard> {
        let mut best: Option<(&TcgCard, u32)> = None;
        for card in cards {
            let score = self.score(card);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((card, score));
            }
        }
        best.map(|(card, _)| card)
    }

    /// Exact name first, then printed total; ties keep the catalog's order.
    fn best_exact<'c>(&self, cards: &'c [TcgCard]) -> Option<&'c TcgCard> {
        let wanted = normalize_name(&self.detected.name);
        let total = self.printed_total();

        let key = |card: &TcgCard| {
            (
                normalize_name(&card.name) == wanted,
                total.is_some() && card.set.printed_total == total,
            )
        };

        let mut best: Option<(&TcgCard, (bool, bool))> = None;
        for card in cards {
            let rank = key(card);
            if best.map_or(true, |(_, top)| rank > top) {
                best = Some((card, rank));
            }
        }
        best.map(|(card, _)| card)
    }
}

/// Resolves detected cards to catalog records, image and price.
#[derive(Clone)]
pub struct CardResolver {
    pokemon_tcg: PokemonTcgClient,
    tcgdex: TcgdexClient,
    set_cache: Arc<SetCache>,
    placeholder_image_url: String,
}

impl CardResolver {
    pub fn new(
        pokemon_tcg: PokemonTcgClient,
        tcgdex: TcgdexClient,
        set_cache: Arc<SetCache>,
        placeholder_image_url: impl Into<String>,
    ) -> Self {
        Self {
            pokemon_tcg,
            tcgdex,
            set_cache,
            placeholder_image_url: placeholder_image_url.into(),
        }
    }

    pub fn pokemon_tcg(&self) -> &PokemonTcgClient {
        &self.pokemon_tcg
    }

    pub fn tcgdex(&self) -> &TcgdexClient {
        &self.tcgdex
    }

    pub fn set_cache(&self) -> &Arc<SetCache> {
        &self.set_cache
    }

    /// Resolves cards one after another, keeping their order.
    pub async fn resolve_all(&self, cards: &[DetectedCard]) -> Vec<ResolvedCard> {
        let mut resolved = Vec::with_capacity(cards.len());
        for card in cards {
            resolved.push(self.resolve(card).await);
        }
        resolved
    }

    /// Never fails: upstream errors only make a stage miss.
    #[tracing::instrument(skip(self, detected), fields(name = %detected.name))]
    pub async fn resolve(&self, detected: &DetectedCard) -> ResolvedCard {
        let set = match detected.set.as_deref() {
            Some(set_name) => self.lookup_set(set_name).await,
            None => None,
        };

        let number = detected.number.as_deref().and_then(CollectorNumber::parse);

        // "25/165" pins the set when exactly one set prints 165 cards
        let set = match (set, number.as_ref().and_then(|n| n.printed_total)) {
            (None, Some(total)) if detected.set.is_none() => self.infer_set(total).await,
            (set, _) => set,
        };

        let ctx = MatchContext {
            detected,
            number,
            set,
        };

        let name = lucene_quote(&detected.name);
        let mut weak_candidate: Option<TcgCard> = None;

        if let (Some(set), Some(number)) = (&ctx.set, &ctx.number) {
            let q = format!("set.id:{} number:{}", set.id, number.number);
            let cards = self
                .search(MatchStage::SetAndNumber, &q, NARROW_PAGE_SIZE, CardOrder::Relevance)
                .await;
            if let Some(card) = cards.iter().find(|c| names_agree(&c.name, &detected.name)) {
                return self.resolved_from_tcg(detected, card, MatchStage::SetAndNumber);
            }
            weak_candidate = cards.into_iter().next();
        }

        if name.is_empty() {
            return self.fallback(detected, weak_candidate);
        }

        if let Some(number) = &ctx.number {
            let q = format!("name:\"{}\" number:{}", name, number.number);
            let cards = self
                .search(MatchStage::NameAndNumber, &q, WIDE_PAGE_SIZE, CardOrder::NewestFirst)
                .await;
            if let Some(card) = ctx.best(&cards) {
                return self.resolved_from_tcg(detected, card, MatchStage::NameAndNumber);
            }
        }

        if let Some(set) = &ctx.set {
            let q = format!("name:\"{}\" set.id:{}", name, set.id);
            let cards = self
                .search(MatchStage::NameAndSet, &q, NARROW_PAGE_SIZE, CardOrder::Relevance)
                .await;
            if let Some(card) = ctx.best(&cards) {
                return self.resolved_from_tcg(detected, card, MatchStage::NameAndSet);
            }
        }

        let q = format!("name:\"{}\"", name);
        let cards = self
            .search(MatchStage::ExactName, &q, WIDE_PAGE_SIZE, CardOrder::NewestFirst)
            .await;
        if let Some(card) = ctx.best_exact(&cards) {
            return self.resolved_from_tcg(detected, card, MatchStage::ExactName);
        }

        let wildcard = lucene_wildcard_term(&base_name(&detected.name));
        if !wildcard.is_empty() {
            let q = format!("name:{}*", wildcard);
            let cards = self
                .search(MatchStage::PartialName, &q, WIDE_PAGE_SIZE, CardOrder::NewestFirst)
                .await;
            let agreeing: Vec<TcgCard> = cards
                .iter()
                .filter(|c| names_agree(&c.name, &detected.name))
                .cloned()
                .collect();
            let pool = if agreeing.is_empty() { &cards } else { &agreeing };
            if let Some(card) = ctx.best(pool) {
                return self.resolved_from_tcg(detected, card, MatchStage::PartialName);
            }
        }

        if let Some(resolved) = self.resolve_with_tcgdex(&ctx).await {
            return resolved;
        }

        self.fallback(detected, weak_candidate)
    }

    fn fallback(&self, detected: &DetectedCard, weak_candidate: Option<TcgCard>) -> ResolvedCard {
        match weak_candidate {
            Some(card) => self.resolved_from_tcg(detected, &card, MatchStage::WeakSetAndNumber),
            None => {
                tracing::info!(name = %detected.name, "No catalog match, using placeholder");
                ResolvedCard::unresolved(detected.clone(), &self.placeholder_image_url)
            }
        }
    }

    async fn lookup_set(&self, set_name: &str) -> Option<CardSet> {
        match self.set_cache.sets(&self.pokemon_tcg).await {
            Ok(sets) => {
                let found = find_set(&sets, set_name).cloned();
                if found.is_none() {
                    tracing::debug!(set_name = %set_name, "Set name not recognized");
                }
                found
            }
            Err(e) => {
                tracing::warn!(error = %e, "Set list unavailable, matching without set");
                None
            }
        }
    }

    async fn infer_set(&self, printed_total: u32) -> Option<CardSet> {
        let sets = match self.set_cache.sets(&self.pokemon_tcg).await {
            Ok(sets) => sets,
            Err(e) => {
                tracing::warn!(error = %e, "Set list unavailable, matching without set");
                return None;
            }
        };

        match sets_with_printed_total(&sets, printed_total).as_slice() {
            [only] => {
                tracing::debug!(set_id = %only.id, printed_total, "Set inferred from printed total");
                Some((*only).clone())
            }
            _ => None,
        }
    }

    async fn search(&self, stage: MatchStage, q: &str, page_size: u32, order: CardOrder) -> Vec<TcgCard> {
        match self.pokemon_tcg.search_cards(q, page_size, order).await {
            Ok(cards) => cards,
            Err(e) => {
                tracing::warn!(stage = ?stage, q = %q, error = %e, "Card search failed");
                Vec::new()
            }
        }
    }

    fn resolved_from_tcg(&self, detected: &DetectedCard, card: &TcgCard, stage: MatchStage) -> ResolvedCard {
        tracing::debug!(stage = ?stage, match_id = %card.id, "Card resolved");

        ResolvedCard {
            detected: detected.clone(),
            image_url: card
                .image_url()
                .unwrap_or(&self.placeholder_image_url)
                .to_string(),
            price: price_from_tcg_card(card),
            match_id: Some(card.id.clone()),
            matched_name: Some(card.name.clone()),
            matched_set: Some(card.set.name.clone()),
            stage,
        }
    }

    async fn resolve_with_tcgdex(&self, ctx: &MatchContext<'_>) -> Option<ResolvedCard> {
        let detected = ctx.detected;

        let briefs = match self.tcgdex.search_by_name(&detected.name).await {
            Ok(briefs) => briefs,
            Err(e) => {
                tracing::warn!(error = %e, "TCGdex search failed");
                return None;
            }
        };

        // number match first, then name match with an image, then any image
        let mut candidates: Vec<&TcgdexCardBrief> = Vec::new();
        if let Some(number) = &ctx.number {
            candidates.extend(
                briefs
                    .iter()
                    .find(|b| numbers_match(&b.local_id, &number.number)),
            );
        }
        candidates.extend(
            briefs
                .iter()
                .find(|b| b.image.is_some() && names_agree(&b.name, &detected.name)),
        );
        candidates.extend(briefs.iter().find(|b| b.image.is_some()));

        let mut tried: Vec<&str> = Vec::new();
        for brief in candidates {
            if tried.contains(&brief.id.as_str()) {
                continue;
            }
            tried.push(&brief.id);

            if let Some(resolved) = self.resolved_from_tcgdex(detected, brief).await {
                return Some(resolved);
            }
        }

        None
    }

    /// `None` when neither the search entry nor the card detail has an image.
    async fn resolved_from_tcgdex(
        &self,
        detected: &DetectedCard,
        brief: &TcgdexCardBrief,
    ) -> Option<ResolvedCard> {
        let card = match self.tcgdex.get_card(&brief.id).await {
            Ok(card) => Some(card),
            Err(e) => {
                tracing::warn!(id = %brief.id, error = %e, "TCGdex card detail failed");
                None
            }
        };

        let image_url = brief
            .image_url()
            .or_else(|| card.as_ref()?.image.as_deref().map(high_quality_image));
        let Some(image_url) = image_url else {
            tracing::debug!(id = %brief.id, "TCGdex card has no image, trying next");
            return None;
        };

        tracing::debug!(match_id = %brief.id, "Card resolved via TCGdex");

        Some(ResolvedCard {
            detected: detected.clone(),
            image_url,
            price: card.as_ref().and_then(price_from_tcgdex_card),
            match_id: Some(brief.id.clone()),
            matched_name: Some(brief.name.clone()),
            matched_set: card.and_then(|c| c.set).map(|s| s.name),
            stage: MatchStage::Tcgdex,
        })
    }
}
