use entity_mapper::{
    resolve, resolve_batch, AliasLink, CanonicalEntity, Decision, DirectoryIntegrityError, EntityId, EntityType,
    InMemoryDirectory, LinkKind, QueryEntity, ResolverConfig,
};

fn company(key: &str, name: &str) -> CanonicalEntity {
    CanonicalEntity::with_id(EntityId::from_key(key), name, EntityType::Company)
}

fn id(key: &str) -> EntityId {
    EntityId::from_key(key)
}

/// A -> B (rename), B -> C (acquisition).
fn transitive_directory() -> InMemoryDirectory {
    InMemoryDirectory::build(vec![
        company("a", "Alpha Hauling").with_link(AliasLink::new("Alpha Hauling", id("b"), LinkKind::Rename)),
        company("b", "Beta Logistics").with_link(AliasLink::new("Beta Logistics", id("c"), LinkKind::Acquisition)),
        company("c", "Gamma Freight Group"),
    ])
    .unwrap()
}

/// X -> Y, Y -> X.
fn cyclic_directory() -> InMemoryDirectory {
    InMemoryDirectory::build(vec![
        company("x", "Xeno Freight").with_link(AliasLink::new("Old Xeno", id("y"), LinkKind::Rename)),
        company("y", "Yardley Freight").with_link(AliasLink::new("Yardley Freight", id("x"), LinkKind::Merger)),
    ])
    .unwrap()
}

const TREES: [&str; 12] = [
    "Alder", "Birch", "Cedar", "Dogwood", "Elm", "Fir", "Ginkgo", "Hazel", "Ivy", "Juniper", "Kauri", "Larch",
];

/// Alder -> Birch -> ... -> Larch, eleven hops.
fn long_chain_directory() -> InMemoryDirectory {
    let entities = TREES.iter().enumerate().map(|(i, name)| {
        let entity = company(name, name);
        match TREES.get(i + 1) {
            Some(next) => entity.with_link(AliasLink::new(*name, id(next), LinkKind::Rename)),
            None => entity,
        }
    });
    InMemoryDirectory::build(entities).unwrap()
}

#[test]
fn chain_is_transitive() {
    let result = resolve(
        &QueryEntity::company("Alpha Hauling"),
        &transitive_directory(),
        &ResolverConfig::default(),
    )
    .unwrap();

    assert_eq!(result.decision, Decision::Matched);
    assert_eq!(result.resolved_entity_id, Some(id("c")));
    let evidence = result.name_change.unwrap();
    assert_eq!(evidence.previous_name, "Alpha Hauling");
    assert_eq!(evidence.current_name, "Gamma Freight Group");
    assert_eq!(evidence.kind, LinkKind::Acquisition);
    assert_eq!(evidence.depth(), 2);
    assert_eq!(evidence.hops[0].to, id("b"));
    assert_eq!(evidence.hops[1].to, id("c"));
}

#[test]
fn chain_is_idempotent() {
    let directory = transitive_directory();
    let config = ResolverConfig::default();

    let first = resolve(&QueryEntity::company("Alpha Hauling"), &directory, &config).unwrap();
    let current_name = first.resolved_name.clone().unwrap();

    let second = resolve(&QueryEntity::company(current_name), &directory, &config).unwrap();
    assert_eq!(second.decision, Decision::Matched);
    assert_eq!(second.resolved_entity_id, first.resolved_entity_id);
    assert!(second.name_change.is_none());
    assert_eq!(second.confidence, 1.0);
}

#[test]
fn intermediate_identity_resolves_forward() {
    let result = resolve(
        &QueryEntity::company("Beta Logistics"),
        &transitive_directory(),
        &ResolverConfig::default(),
    )
    .unwrap();
    assert_eq!(result.resolved_entity_id, Some(id("c")));
    assert_eq!(result.name_change.unwrap().depth(), 1);
}

#[test]
fn cycle_terminates_and_flags_pre_chain_candidate() {
    let result = resolve(
        &QueryEntity::company("Old Xeno"),
        &cyclic_directory(),
        &ResolverConfig::default(),
    )
    .unwrap();

    assert_eq!(result.decision, Decision::Matched);
    assert_eq!(result.resolved_entity_id, Some(id("x")));
    assert!(result.name_change.is_none());
    assert_eq!(
        result.integrity_issues,
        vec![DirectoryIntegrityError::AliasCycle {
            start: id("x"),
            repeated: id("x"),
        }]
    );
    assert!(result.needs_review());
}

#[test]
fn dangling_link_keeps_pre_chain_candidate() {
    let directory = InMemoryDirectory::build(vec![company("z", "Zephyr Lines").with_link(AliasLink::new(
        "Zephyr Lines Inc",
        id("gone"),
        LinkKind::Acquisition,
    ))])
    .unwrap();

    let result = resolve(
        &QueryEntity::company("Zephyr Lines Inc"),
        &directory,
        &ResolverConfig::default(),
    )
    .unwrap();
    assert_eq!(result.resolved_entity_id, Some(id("z")));
    assert!(matches!(
        result.integrity_issues.as_slice(),
        [DirectoryIntegrityError::DanglingLink { start, from, target }]
            if *start == id("z") && *from == id("z") && *target == id("gone")
    ));
}

#[test]
fn dangling_link_mid_chain_names_the_matched_candidate() {
    let directory = InMemoryDirectory::build(vec![
        company("a", "Alpha Hauling").with_link(AliasLink::new("Alpha Hauling", id("b"), LinkKind::Rename)),
        company("b", "Beta Logistics").with_link(AliasLink::new("Beta Logistics", id("gone"), LinkKind::Merger)),
    ])
    .unwrap();

    let result = resolve(
        &QueryEntity::company("Alpha Hauling"),
        &directory,
        &ResolverConfig::default(),
    )
    .unwrap();
    assert_eq!(result.resolved_entity_id, Some(id("a")));
    assert_eq!(result.integrity_issues.len(), 1);
    assert_eq!(result.integrity_issues[0].start(), id("a"));
    assert!(matches!(
        result.integrity_issues[0],
        DirectoryIntegrityError::DanglingLink { from, .. } if from == id("b")
    ));
}

#[test]
fn long_chain_hits_depth_bound() {
    let directory = long_chain_directory();

    let bounded = resolve(&QueryEntity::company("Alder"), &directory, &ResolverConfig::default()).unwrap();
    assert_eq!(bounded.resolved_entity_id, Some(id("Alder")));
    assert_eq!(
        bounded.integrity_issues,
        vec![DirectoryIntegrityError::ChainTooDeep {
            start: id("Alder"),
            max_depth: 10,
        }]
    );

    let deeper = ResolverConfig {
        max_alias_chain_depth: 11,
        ..ResolverConfig::default()
    };
    let resolved = resolve(&QueryEntity::company("Alder"), &directory, &deeper).unwrap();
    assert_eq!(resolved.resolved_entity_id, Some(id("Larch")));
    assert_eq!(resolved.name_change.unwrap().depth(), 11);
    assert!(resolved.integrity_issues.is_empty());
}

#[test]
fn integrity_problems_never_stop_a_batch() {
    let directory = cyclic_directory();
    let queries = vec![
        QueryEntity::company("Old Xeno"),
        QueryEntity::company("Xeno Freight"),
        QueryEntity::company("Quartz Haulers"),
    ];

    let results = resolve_batch(&queries, &directory, &ResolverConfig::default()).unwrap();
    assert_eq!(results.len(), 3);
    assert!(!results[0].as_ref().unwrap().integrity_issues.is_empty());
    assert_eq!(results[1].as_ref().unwrap().resolved_entity_id, Some(id("x")));
    assert_eq!(results[2].as_ref().unwrap().decision, Decision::Unmatched);
}

#[test]
fn audit_reports_what_resolution_flags() {
    let issues = cyclic_directory().audit();
    assert!(issues
        .iter()
        .any(|issue| matches!(issue, DirectoryIntegrityError::AliasCycle { .. })));
    assert!(transitive_directory().audit().is_empty());
}
