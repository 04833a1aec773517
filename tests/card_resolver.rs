mod common;

use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, ResponseTemplate,
};

use binderscan::api::AppState;
use binderscan::models::{DetectedCard, MatchStage};
use binderscan::services::{card_resolver::CardResolver, pokemon_tcg::PokemonTcgClient, set_cache::SetCache};
use common::*;

fn resolver(upstreams: &Upstreams) -> CardResolver {
    AppState::from_config(upstreams.config(None)).unwrap().resolver
}

async fn mount_search(upstreams: &Upstreams, q: &str, cards: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path("/v2/cards"))
        .and(query_param("q", q))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(cards)))
        .mount(&upstreams.pokemon_tcg)
        .await;
}

#[tokio::test]
async fn test_set_and_number_match() {
    let upstreams = Upstreams::start().await;
    mount_sets(&upstreams.pokemon_tcg, standard_sets()).await;
    mount_search(
        &upstreams,
        "set.id:sv3 number:125",
        vec![card_json(
            "sv3-125",
            "Charizard ex",
            "125",
            set_json("sv3", "Obsidian Flames", 197),
        )],
    )
    .await;

    let detected = DetectedCard::new("Charizard EX")
        .with_set("Scarlet & Violet Obsidian Flames")
        .with_number("125/197");
    let resolved = resolver(&upstreams).resolve(&detected).await;

    assert_eq!(resolved.stage, MatchStage::SetAndNumber);
    assert_eq!(resolved.match_id.as_deref(), Some("sv3-125"));
    assert_eq!(resolved.image_url, "https://images.test/sv3-125_hires.png");
    assert_eq!(resolved.matched_set.as_deref(), Some("Obsidian Flames"));
    let price = resolved.price.unwrap();
    assert_eq!(price.amount, 1.5);
    assert_eq!(price.currency, "USD");
    // detected fields are kept as reported
    assert_eq!(resolved.detected.name, "Charizard EX");
}

#[tokio::test]
async fn test_set_inferred_from_printed_total() {
    let upstreams = Upstreams::start().await;
    mount_sets(&upstreams.pokemon_tcg, standard_sets()).await;
    mount_search(
        &upstreams,
        "set.id:sv3pt5 number:25",
        vec![card_json("sv3pt5-25", "Pikachu", "25", set_json("sv3pt5", "151", 165))],
    )
    .await;

    let detected = DetectedCard::new("Pikachu").with_number("025/165");
    let resolved = resolver(&upstreams).resolve(&detected).await;

    assert_eq!(resolved.stage, MatchStage::SetAndNumber);
    assert_eq!(resolved.match_id.as_deref(), Some("sv3pt5-25"));
}

#[tokio::test]
async fn test_name_and_number_prefers_printed_total() {
    let upstreams = Upstreams::start().await;
    mount_search(
        &upstreams,
        "name:\"Charizard\" number:4",
        vec![
            card_json("base4-4", "Charizard", "4", set_json("base4", "Base Set 2", 130)),
            card_json("base1-4", "Charizard", "4", set_json("base1", "Base", 102)),
        ],
    )
    .await;

    let detected = DetectedCard::new("Charizard").with_number("004/102");
    let resolved = resolver(&upstreams).resolve(&detected).await;

    assert_eq!(resolved.stage, MatchStage::NameAndNumber);
    assert_eq!(resolved.match_id.as_deref(), Some("base1-4"));
}

#[tokio::test]
async fn test_name_and_set_match() {
    let upstreams = Upstreams::start().await;
    mount_sets(&upstreams.pokemon_tcg, standard_sets()).await;
    mount_search(
        &upstreams,
        "name:\"Pikachu\" set.id:sv3pt5",
        vec![card_json("sv3pt5-25", "Pikachu", "25", set_json("sv3pt5", "151", 165))],
    )
    .await;

    let detected = DetectedCard::new("Pikachu").with_set("Pokemon 151");
    let resolved = resolver(&upstreams).resolve(&detected).await;

    assert_eq!(resolved.stage, MatchStage::NameAndSet);
    assert_eq!(resolved.match_id.as_deref(), Some("sv3pt5-25"));
}

#[tokio::test]
async fn test_exact_name_match_is_newest_first() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cards"))
        .and(query_param("q", "name:\"Eevee\""))
        .and(query_param("orderBy", "-set.releaseDate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![
            card_json("sv8-143", "Eevee", "143", set_json("sv8", "Surging Sparks", 191)),
            card_json("base2-51", "Eevee", "51", set_json("base2", "Jungle", 64)),
        ])))
        .mount(&upstreams.pokemon_tcg)
        .await;

    let resolved = resolver(&upstreams).resolve(&DetectedCard::new("Eevee")).await;

    assert_eq!(resolved.stage, MatchStage::ExactName);
    assert_eq!(resolved.match_id.as_deref(), Some("sv8-143"));
}

#[tokio::test]
async fn test_exact_name_beats_printed_total() {
    let upstreams = Upstreams::start().await;
    mount_search(
        &upstreams,
        "name:\"Charizard\"",
        vec![
            card_json("base1-99", "Charizard ex", "99", set_json("base1", "Base", 102)),
            card_json("base4-4", "Charizard", "4", set_json("base4", "Base Set 2", 130)),
        ],
    )
    .await;

    // only the first record shares the printed total, only the second the name
    let detected = DetectedCard::new("Charizard").with_number("98/102");
    let resolved = resolver(&upstreams).resolve(&detected).await;

    assert_eq!(resolved.stage, MatchStage::ExactName);
    assert_eq!(resolved.match_id.as_deref(), Some("base4-4"));
    assert_eq!(resolved.matched_name.as_deref(), Some("Charizard"));
}

#[tokio::test]
async fn test_exact_name_uses_printed_total_between_equal_names() {
    let upstreams = Upstreams::start().await;
    mount_search(
        &upstreams,
        "name:\"Charizard\"",
        vec![
            card_json("base4-4", "Charizard", "4", set_json("base4", "Base Set 2", 130)),
            card_json("base1-4", "Charizard", "4", set_json("base1", "Base", 102)),
        ],
    )
    .await;

    let detected = DetectedCard::new("Charizard").with_number("98/102");
    let resolved = resolver(&upstreams).resolve(&detected).await;

    assert_eq!(resolved.stage, MatchStage::ExactName);
    assert_eq!(resolved.match_id.as_deref(), Some("base1-4"));
}

#[tokio::test]
async fn test_partial_name_match() {
    let upstreams = Upstreams::start().await;
    mount_search(
        &upstreams,
        "name:mewtwo*",
        vec![
            card_json("sm8-71", "Mewtwo & Mew-GX", "71", set_json("sm8", "Lost Thunder", 214)),
            card_json("sv3pt5-150", "Mewtwo", "150", set_json("sv3pt5", "151", 165)),
        ],
    )
    .await;

    // "Mewtwo ex" has no exact record here; the base name still finds Mewtwo
    let resolved = resolver(&upstreams).resolve(&DetectedCard::new("Mewtwo ex")).await;

    assert_eq!(resolved.stage, MatchStage::PartialName);
    assert_eq!(resolved.match_id.as_deref(), Some("sv3pt5-150"));
}

#[tokio::test]
async fn test_tcgdex_fallback() {
    let upstreams = Upstreams::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/en/cards"))
        .and(query_param("name", "Furret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "swsh3-135", "localId": "135", "name": "Furret",
             "image": "https://assets.test/en/swsh/swsh3/135"},
            {"id": "swsh3-136", "localId": "136", "name": "Furret",
             "image": "https://assets.test/en/swsh/swsh3/136"}
        ])))
        .mount(&upstreams.tcgdex)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/en/cards/swsh3-136"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "swsh3-136",
            "localId": "136",
            "name": "Furret",
            "image": "https://assets.test/en/swsh/swsh3/136",
            "set": {"id": "swsh3", "name": "Darkness Ablaze"},
            "pricing": {"cardmarket": {"avg": 0.08, "trend": 0.1, "unit": "EUR"}}
        })))
        .mount(&upstreams.tcgdex)
        .await;

    let detected = DetectedCard::new("Furret").with_number("136/189");
    let resolved = resolver(&upstreams).resolve(&detected).await;

    assert_eq!(resolved.stage, MatchStage::Tcgdex);
    assert_eq!(resolved.match_id.as_deref(), Some("swsh3-136"));
    assert_eq!(resolved.image_url, "https://assets.test/en/swsh/swsh3/136/high.png");
    assert_eq!(resolved.matched_set.as_deref(), Some("Darkness Ablaze"));
    let price = resolved.price.unwrap();
    assert_eq!(price.amount, 0.08);
    assert_eq!(price.currency, "EUR");
}

#[tokio::test]
async fn test_tcgdex_number_match_without_image_falls_back_to_imaged_card() {
    let upstreams = Upstreams::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/en/cards"))
        .and(query_param("name", "Furret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "x-7", "localId": "7", "name": "Furret"},
            {"id": "y-1", "localId": "1", "name": "Furret",
             "image": "https://assets.test/en/y/y/1"}
        ])))
        .mount(&upstreams.tcgdex)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/en/cards/x-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "x-7", "localId": "7", "name": "Furret"
        })))
        .mount(&upstreams.tcgdex)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/en/cards/y-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "y-1", "localId": "1", "name": "Furret",
            "image": "https://assets.test/en/y/y/1",
            "set": {"id": "y", "name": "Y Set"}
        })))
        .mount(&upstreams.tcgdex)
        .await;

    let detected = DetectedCard::new("Furret").with_number("7");
    let resolved = resolver(&upstreams).resolve(&detected).await;

    assert_eq!(resolved.stage, MatchStage::Tcgdex);
    assert_eq!(resolved.match_id.as_deref(), Some("y-1"));
    assert_eq!(resolved.image_url, "https://assets.test/en/y/y/1/high.png");
    assert_eq!(resolved.matched_set.as_deref(), Some("Y Set"));
}

#[tokio::test]
async fn test_weak_set_and_number_candidate_beats_placeholder() {
    let upstreams = Upstreams::start().await;
    mount_sets(&upstreams.pokemon_tcg, standard_sets()).await;
    mount_search(
        &upstreams,
        "set.id:base1 number:58",
        vec![card_json("base1-58", "Pikachu", "58", set_json("base1", "Base", 102))],
    )
    .await;

    // misread name, correct set and number
    let detected = DetectedCard::new("Pikachoo").with_set("Base Set").with_number("58/102");
    let resolved = resolver(&upstreams).resolve(&detected).await;

    assert_eq!(resolved.stage, MatchStage::WeakSetAndNumber);
    assert_eq!(resolved.match_id.as_deref(), Some("base1-58"));
}

#[tokio::test]
async fn test_unresolved_uses_placeholder() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/cards"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&upstreams.pokemon_tcg)
        .await;

    let resolved = resolver(&upstreams)
        .resolve(&DetectedCard::new("Missingno").with_number("0"))
        .await;

    assert_eq!(resolved.stage, MatchStage::Unresolved);
    assert_eq!(resolved.image_url, PLACEHOLDER);
    assert!(resolved.price.is_none());
    assert!(resolved.match_id.is_none());
}

#[tokio::test]
async fn test_resolve_all_keeps_order_and_fetches_sets_once() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/sets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(standard_sets())))
        .expect(1)
        .mount(&upstreams.pokemon_tcg)
        .await;
    mount_search(
        &upstreams,
        "name:\"Bulbasaur\" set.id:sv3pt5",
        vec![card_json("sv3pt5-1", "Bulbasaur", "1", set_json("sv3pt5", "151", 165))],
    )
    .await;

    let cards = vec![
        DetectedCard::new("Bulbasaur").with_set("151"),
        DetectedCard::new("Nobody").with_set("151"),
    ];
    let resolved = resolver(&upstreams).resolve_all(&cards).await;

    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].stage, MatchStage::NameAndSet);
    assert_eq!(resolved[1].detected.name, "Nobody");
    assert_eq!(resolved[1].stage, MatchStage::Unresolved);
}

#[tokio::test]
async fn test_set_cache_serves_stale_list_when_refresh_fails() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/sets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(standard_sets())))
        .up_to_n_times(1)
        .mount(&upstreams.pokemon_tcg)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/sets"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&upstreams.pokemon_tcg)
        .await;

    let client = PokemonTcgClient::from_config(&upstreams.config(None)).unwrap();
    // every read is a miss with a zero TTL
    let cache = SetCache::new(Duration::ZERO);

    let first = cache.sets(&client).await.unwrap();
    assert_eq!(first.len(), 4);

    let second = cache.sets(&client).await.unwrap();
    assert_eq!(second.len(), 4);
    assert!(cache.age().await.is_some());
}

#[tokio::test]
async fn test_set_cache_error_without_stale_copy() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/sets"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&upstreams.pokemon_tcg)
        .await;

    let client = PokemonTcgClient::from_config(&upstreams.config(None)).unwrap();
    let cache = SetCache::new(Duration::from_secs(3600));

    assert!(cache.sets(&client).await.is_err());
    assert!(cache.age().await.is_none());
}

#[tokio::test]
async fn test_set_cache_backs_off_after_failure() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/sets"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&upstreams.pokemon_tcg)
        .await;

    let client = PokemonTcgClient::from_config(&upstreams.config(None)).unwrap();
    let cache = SetCache::new(Duration::from_secs(3600));

    assert!(cache.sets(&client).await.is_err());
    // within the backoff window the upstream is not asked again
    assert!(cache.sets(&client).await.is_err());
    assert!(cache.sets(&client).await.is_err());
}

#[tokio::test]
async fn test_set_cache_retries_once_backoff_expires() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/sets"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&upstreams.pokemon_tcg)
        .await;
    mount_sets(&upstreams.pokemon_tcg, standard_sets()).await;

    let client = PokemonTcgClient::from_config(&upstreams.config(None)).unwrap();
    let cache = SetCache::new(Duration::from_secs(3600)).with_failure_backoff(Duration::ZERO);

    assert!(cache.sets(&client).await.is_err());
    assert_eq!(cache.sets(&client).await.unwrap().len(), 4);
}
