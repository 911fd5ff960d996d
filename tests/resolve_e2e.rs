use std::io::Write;
use std::sync::Arc;

use entity_mapper::{
    resolve, resolve_batch, AliasLink, CanonicalEntity, Decision, DirectoryHandle, EntityId, EntityMapper, EntityType,
    InMemoryDirectory, LinkKind, Metric, QueryEntity, ResolverConfig,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn company(key: &str, name: &str) -> CanonicalEntity {
    CanonicalEntity::with_id(EntityId::from_key(key), name, EntityType::Company)
}

fn freight_directory() -> InMemoryDirectory {
    InMemoryDirectory::build(vec![
        company("comp001", "Bennett Truck Transport, LLC")
            .with_alias("Bennett")
            .with_alias("BTT"),
        company("comp002", "Road Masters Transportation").with_alias("Road Masters"),
        company("comp003", "Acme Trucking Company"),
        company("comp004", "Steve Trucking Company"),
        company("comp005", "GT Express Incorporated").with_alias("GTE"),
        company("old004", "Steve's Trucking").with_link(AliasLink::new(
            "Steve's Trucking",
            EntityId::from_key("comp004"),
            LinkKind::Acquisition,
        )),
        CanonicalEntity::with_id(EntityId::from_key("loc001"), "McDonough Terminal", EntityType::Location),
    ])
    .unwrap()
}

#[test]
fn abbreviation_resolves_to_full_name() {
    init_tracing();
    let result = resolve(
        &QueryEntity::company("Acme Trucking Co"),
        &freight_directory(),
        &ResolverConfig::default(),
    )
    .unwrap();

    assert_eq!(result.decision, Decision::Matched);
    assert_eq!(result.resolved_name.as_deref(), Some("Acme Trucking Company"));
    assert!(result.confidence >= 0.85);
    assert!(!result.needs_review());

    let top = &result.candidates[0];
    for metric in Metric::ALL {
        assert_eq!(top.scores.get(metric), Some(1.0), "{metric}");
    }
}

#[test]
fn acquisition_resolves_to_current_entity_with_evidence() {
    init_tracing();
    let result = resolve(
        &QueryEntity::company("Steve's Trucking"),
        &freight_directory(),
        &ResolverConfig::default(),
    )
    .unwrap();

    assert_eq!(result.decision, Decision::Matched);
    assert_eq!(result.resolved_entity_id, Some(EntityId::from_key("comp004")));
    assert_eq!(result.resolved_name.as_deref(), Some("Steve Trucking Company"));

    let evidence = result.name_change.as_ref().unwrap();
    assert_eq!(evidence.to_string(), "Steve's Trucking -> Steve Trucking Company (acquisition)");
    assert_eq!(evidence.kind, LinkKind::Acquisition);
    assert!((result.confidence - 0.95).abs() < 1e-9);

    // The former identity and its successor collapse into one ranked entry.
    let ids: Vec<EntityId> = result.candidates.iter().map(|c| c.entity_id).collect();
    assert_eq!(ids.iter().filter(|id| **id == EntityId::from_key("comp004")).count(), 1);
    assert!(!ids.contains(&EntityId::from_key("old004")));
}

#[test]
fn unknown_company_is_unmatched() {
    let result = resolve(
        &QueryEntity::company("XYZ Freight"),
        &freight_directory(),
        &ResolverConfig::default(),
    )
    .unwrap();

    assert_eq!(result.decision, Decision::Unmatched);
    assert!(result.resolved_entity_id.is_none());
    assert!(result.needs_review());
    assert!(result.candidates.iter().all(|c| c.confidence < 0.85));
}

#[test]
fn acronym_alias_and_derived_acronym() {
    let directory = freight_directory();
    let config = ResolverConfig::default();

    let alias_hit = resolve(&QueryEntity::company("GTE"), &directory, &config).unwrap();
    assert_eq!(alias_hit.resolved_entity_id, Some(EntityId::from_key("comp005")));

    // "RMT" is not an alias; it is derived from "Road Masters Transportation".
    let derived = resolve(&QueryEntity::company("RMT"), &directory, &config).unwrap();
    assert_eq!(derived.candidates[0].entity_id, EntityId::from_key("comp002"));
    assert_eq!(derived.candidates[0].scores.get(Metric::Acronym), Some(1.0));
    assert_eq!(derived.decision, Decision::Matched);
}

#[test]
fn entity_type_partitions_the_directory() {
    let directory = freight_directory();
    let config = ResolverConfig::default();

    let as_company = resolve(&QueryEntity::company("McDonough Terminal"), &directory, &config).unwrap();
    assert_eq!(as_company.decision, Decision::Unmatched);

    let as_location = resolve(
        &QueryEntity::new("McDonough Terminal", EntityType::Location),
        &directory,
        &config,
    )
    .unwrap();
    assert_eq!(as_location.resolved_entity_id, Some(EntityId::from_key("loc001")));
}

#[test]
fn near_duplicates_are_ambiguous() {
    let directory = InMemoryDirectory::build(vec![
        company("a", "Atlas Freight Lines"),
        company("b", "Atlas Freight Line"),
    ])
    .unwrap();
    let config = ResolverConfig {
        match_threshold: 0.75,
        ..ResolverConfig::default()
    };

    let result = resolve(&QueryEntity::company("Atlas Freight Lnes"), &directory, &config).unwrap();
    assert_eq!(result.decision, Decision::Ambiguous);
    assert!(result.resolved_entity_id.is_none());
    assert!(result.candidates.len() >= 2);
    assert!(result.candidates[0].confidence - result.candidates[1].confidence < config.tie_margin);
    assert!(result.needs_review());
}

#[test]
fn near_identical_names_with_different_details_stay_unmatched() {
    init_tracing();
    let config = ResolverConfig::default();
    let pairs = [
        (EntityType::Company, "Globe Freight Lines 12", "Globe Freight Lines 13"),
        (EntityType::Company, "Southeastern Freight Lines South", "Southeastern Freight Lines North"),
        (EntityType::ShipmentReference, "BOL-2024-000123", "BOL-2024-000124"),
        (EntityType::Company, "PRO 1234567890124", "PRO 1234567890123"),
    ];

    for (entity_type, query, known) in pairs {
        let directory =
            InMemoryDirectory::build(vec![CanonicalEntity::with_id(EntityId::from_key(known), known, entity_type)])
                .unwrap();
        let result = resolve(&QueryEntity::new(query, entity_type), &directory, &config).unwrap();

        assert_eq!(result.decision, Decision::Unmatched, "{query} vs {known}");
        assert!(result.resolved_entity_id.is_none());
        assert!(result.confidence < config.match_threshold, "{query}: {}", result.confidence);
        let top = &result.candidates[0];
        assert!(top.scores.get(Metric::AliasString).unwrap() < config.clamp_threshold);
    }
}

#[test]
fn exact_reference_still_matches() {
    let directory = InMemoryDirectory::build(vec![CanonicalEntity::with_id(
        EntityId::from_key("bol123"),
        "BOL-2024-000123",
        EntityType::ShipmentReference,
    )])
    .unwrap();
    let result = resolve(
        &QueryEntity::new("bol 2024 000123", EntityType::ShipmentReference),
        &directory,
        &ResolverConfig::default(),
    )
    .unwrap();
    assert_eq!(result.decision, Decision::Matched);
    assert_eq!(result.confidence, 1.0);
}

#[test]
fn acronym_match_survives_a_crowded_block() {
    init_tracing();
    let entities = std::iter::once(company("ibm", "International Business Machines"))
        .chain((0..500).map(|n| company(&format!("iowa{n}"), &format!("Iowa Hauling {n}"))));
    let directory = InMemoryDirectory::build(entities).unwrap();
    let config = ResolverConfig::default();
    assert!(directory.len() > config.max_candidates);

    let result = resolve(&QueryEntity::company("IBM"), &directory, &config).unwrap();
    assert_eq!(result.decision, Decision::Matched);
    assert_eq!(result.resolved_entity_id, Some(EntityId::from_key("ibm")));
    assert_eq!(result.confidence, 1.0);
}

#[test]
fn results_are_deterministic() {
    let directory = freight_directory();
    let config = ResolverConfig::default();
    let queries = ["Bennett Truck Transprt", "Road Master", "Steve's Trucking", "XYZ Freight"];

    for name in queries {
        let query = QueryEntity::company(name);
        let first = resolve(&query, &directory, &config).unwrap();
        let second = resolve(&query, &directory, &config).unwrap();
        assert_eq!(first, second, "{name}");
    }
}

#[test]
fn batch_matches_sequential_resolution() {
    init_tracing();
    let directory = freight_directory();
    let config = ResolverConfig::default();
    let queries: Vec<QueryEntity> = [
        "Acme Trucking Co",
        "Steve's Trucking",
        "BTT",
        "Road Masters",
        "XYZ Freight",
        "GT Xpress Inc",
        "  ",
        "Bennett",
    ]
    .into_iter()
    .map(QueryEntity::company)
    .collect();

    let batch = resolve_batch(&queries, &directory, &config).unwrap();
    assert_eq!(batch.len(), queries.len());

    for (query, got) in queries.iter().zip(&batch) {
        match resolve(query, &directory, &config) {
            Ok(expected) => assert_eq!(got.as_ref().unwrap(), &expected),
            Err(expected) => assert_eq!(got.as_ref().unwrap_err().to_string(), expected.to_string()),
        }
    }
}

#[test]
fn mapper_over_swapped_snapshots() {
    let handle = DirectoryHandle::new(InMemoryDirectory::build(vec![company("comp003", "Acme Trucking Company")]).unwrap());
    let before = EntityMapper::from_shared(handle.snapshot().unwrap(), ResolverConfig::default()).unwrap();

    handle
        .replace(InMemoryDirectory::build(vec![company("comp009", "Zenith Haulage")]).unwrap())
        .unwrap();
    let after = EntityMapper::from_shared(handle.snapshot().unwrap(), ResolverConfig::default()).unwrap();

    let query = QueryEntity::company("Acme Trucking Co");
    let old = before.resolve(&query).unwrap();
    let new = after.resolve(&query).unwrap();
    assert_eq!(old.decision, Decision::Matched);
    assert_eq!(new.decision, Decision::Unmatched);
    assert_ne!(old.snapshot, new.snapshot);
    assert_eq!(Arc::strong_count(before.directory()), 1);
}

#[test]
fn directory_loads_from_json_file() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "entities": [
                {{"id": "comp001", "name": "Bennett Truck Transport, LLC", "type": "company", "aliases": ["Bennett", "BTT"]}},
                {{"id": "comp003", "name": "Bennett International Logistics, LLC", "type": "company"}},
                {{"id": "comp005", "name": "GT Express Incorporated", "type": "company", "aliases": ["GT Express", "GTE"]}}
            ],
            "name_changes": [
                {{"previous_name": "GT XPRESS INC", "current_name": "GT Express Incorporated",
                  "entity_id": "comp005", "change_date": "2018-06-30", "change_reason": "acquisition"}},
                {{"previous_name": "Bennett Logistics International", "entity_id": "comp003",
                  "change_date": "2017-11-01", "change_reason": "restructuring"}}
            ]
        }}"#
    )
    .unwrap();

    let directory = InMemoryDirectory::from_path(file.path()).unwrap();
    assert_eq!(directory.len(), 5);
    assert!(directory.audit().is_empty());

    let mapper = EntityMapper::new(directory, ResolverConfig::default()).unwrap();
    let result = mapper.resolve(&QueryEntity::company("Bennett Logistics International")).unwrap();
    assert_eq!(result.decision, Decision::Matched);
    assert_eq!(result.resolved_entity_id, Some(EntityId::from_key("comp003")));
    let evidence = result.name_change.unwrap();
    assert_eq!(evidence.kind, LinkKind::Rename);
    assert_eq!(evidence.effective_date.map(|d| d.to_string()).as_deref(), Some("2017-11-01"));
}

#[test]
fn missing_directory_file_is_an_io_error() {
    let err = InMemoryDirectory::from_path("/nonexistent/entity-directory.json").unwrap_err();
    assert!(matches!(err, entity_mapper::DirectoryError::Io(_)));
}
