//! Roles adopting roles: transitive contribution, cycles, diamonds and
//! collisions that only the adopting type can settle.

use std::sync::Arc;

use rolecraft_core::{
    AdoptingType, ComposerConfig, CompositionEngine, CompositionError, CompositionState,
    DeclarativeVeto, Implementation, MethodSignature, Provider, RoleDefinition, RoleId,
    RoleRegistry,
};
use serde_json::{json, Value};

fn sig(name: &str) -> MethodSignature {
    MethodSignature::instance(name)
}

fn engine_with(defs: Vec<RoleDefinition>) -> CompositionEngine {
    let mut builder = RoleRegistry::builder();
    for def in defs {
        builder.register(def).unwrap();
    }
    CompositionEngine::new(Arc::new(builder.freeze()), ComposerConfig::default())
}

#[test]
fn test_composed_role_contributes_without_direct_declaration() {
    let engine = engine_with(vec![
        RoleDefinition::new("R1")
            .composes("R2")
            .provides(sig("outer"), Implementation::constant("R1.outer", json!("outer"))),
        RoleDefinition::new("R2")
            .provides(sig("inner"), Implementation::constant("R2.inner", json!("inner"))),
    ]);
    let handle = engine.declare(AdoptingType::new("T").adopts("R1")).unwrap();

    let table = engine.compose(&handle).unwrap();
    assert_eq!(
        table.provider_of(&sig("inner")),
        Some(&Provider::Role {
            origin: RoleId::from("R2"),
            via: RoleId::from("R1"),
        })
    );
    let inner = engine
        .dispatch(&handle, &sig("inner"), &Value::Null, &[])
        .unwrap();
    assert_eq!(inner, json!("inner"));
}

#[test]
fn test_transitive_capability_satisfaction() {
    // R1 requires `helper`; only R3, two levels down, provides it.
    let engine = engine_with(vec![
        RoleDefinition::new("R1")
            .requires(sig("helper"))
            .composes("R2")
            .provides(sig("work"), Implementation::placeholder("R1.work")),
        RoleDefinition::new("R2").composes("R3"),
        RoleDefinition::new("R3").provides(sig("helper"), Implementation::placeholder("R3.helper")),
    ]);
    let handle = engine.declare(AdoptingType::new("T").adopts("R1")).unwrap();
    let table = engine.compose(&handle).unwrap();
    assert!(table.contains(&sig("helper")));
    assert!(table.contains(&sig("work")));
}

#[test]
fn test_requirement_of_composed_role_is_checked() {
    let engine = engine_with(vec![
        RoleDefinition::new("Outer").composes("Inner"),
        RoleDefinition::new("Inner").requires(sig("clock")),
    ]);
    let handle = engine
        .declare(AdoptingType::new("T").adopts("Outer"))
        .unwrap();
    match engine.compose(&handle).unwrap_err() {
        CompositionError::MissingCapability { missing, .. } => {
            assert_eq!(missing[0].signature, sig("clock"));
            assert_eq!(missing[0].required_by, vec![RoleId::from("Inner")]);
        }
        other => panic!("Expected MissingCapability, got {:?}", other),
    }
}

#[test]
fn test_two_role_cycle_fails_without_hanging() {
    let engine = engine_with(vec![
        RoleDefinition::new("R1").composes("R2"),
        RoleDefinition::new("R2").composes("R1"),
    ]);
    let handle = engine.declare(AdoptingType::new("T").adopts("R1")).unwrap();

    let err = engine.compose(&handle).unwrap_err();
    assert_eq!(
        err,
        CompositionError::RoleCycle {
            cycle: vec![RoleId::from("R1"), RoleId::from("R2"), RoleId::from("R1")],
        }
    );
    assert_eq!(err.to_string(), "role composition cycle: R1 -> R2 -> R1");
    assert_eq!(engine.state(&handle), CompositionState::Failed);
}

#[test]
fn test_self_composition_rejected_at_registration() {
    let mut builder = RoleRegistry::builder();
    let err = builder
        .register(RoleDefinition::new("Ouroboros").composes("Ouroboros"))
        .unwrap_err();
    assert!(matches!(err, CompositionError::RoleCycle { .. }));
}

#[test]
fn test_cycle_does_not_poison_unrelated_types() {
    let engine = engine_with(vec![
        RoleDefinition::new("R1").composes("R2"),
        RoleDefinition::new("R2").composes("R1"),
        RoleDefinition::new("Fine").provides(sig("ok"), Implementation::placeholder("Fine.ok")),
    ]);
    let bad = engine.declare(AdoptingType::new("Bad").adopts("R1")).unwrap();
    let good = engine.declare(AdoptingType::new("Good").adopts("Fine")).unwrap();

    assert!(engine.compose(&bad).is_err());
    assert!(engine.compose(&good).is_ok());
}

#[test]
fn test_diamond_through_two_declared_roles_is_not_a_conflict() {
    let engine = engine_with(vec![
        RoleDefinition::new("Left").composes("Base"),
        RoleDefinition::new("Right").composes("Base"),
        RoleDefinition::new("Base").provides(sig("base"), Implementation::placeholder("Base.base")),
    ]);
    let handle = engine
        .declare(AdoptingType::new("T").adopts("Left").adopts("Right"))
        .unwrap();

    let table = engine.compose(&handle).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(
        table.provider_of(&sig("base")).and_then(Provider::origin),
        Some(&RoleId::from("Base"))
    );
}

fn bundle_of_left_and_right() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition::new("Bundle").composes("Left").composes("Right"),
        RoleDefinition::new("Left")
            .provides(sig("run"), Implementation::constant("Left.run", json!("left"))),
        RoleDefinition::new("Right")
            .provides(sig("run"), Implementation::constant("Right.run", json!("right"))),
    ]
}

#[test]
fn test_role_method_and_composed_role_method_conflict_at_type_level() {
    let engine = engine_with(vec![
        RoleDefinition::new("R1")
            .composes("R2")
            .provides(sig("s"), Implementation::constant("R1.s", json!("r1"))),
        RoleDefinition::new("R2").provides(sig("s"), Implementation::constant("R2.s", json!("r2"))),
    ]);
    let handle = engine.declare(AdoptingType::new("T").adopts("R1")).unwrap();

    match engine.compose(&handle).unwrap_err() {
        CompositionError::RoleConflict { owner, conflicts } => {
            assert_eq!(owner, "type T");
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].signature, sig("s"));
            assert_eq!(conflicts[0].roles, vec![RoleId::from("R1"), RoleId::from("R2")]);
        }
        other => panic!("Expected RoleConflict, got {:?}", other),
    }
}

#[test]
fn test_veto_picks_between_role_and_its_composed_role() {
    let engine = engine_with(vec![
        RoleDefinition::new("R1")
            .composes("R2")
            .provides(sig("s"), Implementation::constant("R1.s", json!("r1"))),
        RoleDefinition::new("R2").provides(sig("s"), Implementation::constant("R2.s", json!("r2"))),
    ]);
    let handle = engine
        .declare(
            AdoptingType::new("T")
                .adopts("R1")
                .with_veto(DeclarativeVeto::new().exclude("R1", sig("s"))),
        )
        .unwrap();

    engine.compose(&handle).unwrap();
    let out = engine.dispatch(&handle, &sig("s"), &Value::Null, &[]).unwrap();
    assert_eq!(out, json!("r2"));
}

#[test]
fn test_collision_between_composed_roles_fails_at_type_level() {
    let engine = engine_with(bundle_of_left_and_right());
    let handle = engine
        .declare(AdoptingType::new("T").adopts("Bundle"))
        .unwrap();

    match engine.compose(&handle).unwrap_err() {
        CompositionError::RoleConflict { owner, conflicts } => {
            assert_eq!(owner, "type T");
            assert_eq!(conflicts[0].signature, sig("run"));
            assert_eq!(
                conflicts[0].roles,
                vec![RoleId::from("Left"), RoleId::from("Right")]
            );
        }
        other => panic!("Expected RoleConflict, got {:?}", other),
    }
    assert_eq!(engine.metrics().conflicts_detected(), 1);
}

#[test]
fn test_own_method_settles_collision_between_composed_roles() {
    let engine = engine_with(bundle_of_left_and_right());
    let handle = engine
        .declare(
            AdoptingType::new("T")
                .adopts("Bundle")
                .implements(sig("run"), Implementation::constant("T.run", json!("own"))),
        )
        .unwrap();

    let table = engine.compose(&handle).unwrap();
    assert_eq!(table.provider_of(&sig("run")), Some(&Provider::Own));
    let out = engine.dispatch(&handle, &sig("run"), &Value::Null, &[]).unwrap();
    assert_eq!(out, json!("own"));
    assert_eq!(engine.metrics().conflicts_detected(), 0);
}

#[test]
fn test_veto_settles_collision_between_composed_roles() {
    let engine = engine_with(bundle_of_left_and_right());
    let handle = engine
        .declare(
            AdoptingType::new("T")
                .adopts("Bundle")
                .with_veto(DeclarativeVeto::new().exclude("Right", sig("run"))),
        )
        .unwrap();

    let table = engine.compose(&handle).unwrap();
    assert_eq!(
        table.provider_of(&sig("run")),
        Some(&Provider::Role {
            origin: RoleId::from("Left"),
            via: RoleId::from("Bundle"),
        })
    );
    let out = engine.dispatch(&handle, &sig("run"), &Value::Null, &[]).unwrap();
    assert_eq!(out, json!("left"));
    assert_eq!(engine.metrics().candidates_vetoed(), 1);
}

#[test]
fn test_collision_two_levels_down_is_resolved_by_the_adopter() {
    // Outer -> Bundle -> {Left, Right}: the adopter still sees both origins.
    let mut defs = bundle_of_left_and_right();
    defs.push(RoleDefinition::new("Outer").composes("Bundle"));
    let engine = engine_with(defs);
    let owned = engine
        .declare(
            AdoptingType::new("Owned")
                .adopts("Outer")
                .implements(sig("run"), Implementation::placeholder("Owned.run")),
        )
        .unwrap();
    let bare = engine
        .declare(AdoptingType::new("Bare").adopts("Outer"))
        .unwrap();

    assert!(engine.compose(&owned).is_ok());
    assert!(matches!(
        engine.compose(&bare),
        Err(CompositionError::RoleConflict { ref owner, .. }) if owner == "type Bare"
    ));
}

#[test]
fn test_shared_role_closure_is_built_once_across_types() {
    let engine = engine_with(vec![
        RoleDefinition::new("Outer").composes("Inner"),
        RoleDefinition::new("Inner")
            .provides(sig("shared"), Implementation::placeholder("Inner.shared")),
    ]);
    let a = engine.declare(AdoptingType::new("A").adopts("Outer")).unwrap();
    let b = engine.declare(AdoptingType::new("B").adopts("Outer")).unwrap();

    let ta = engine.compose(&a).unwrap();
    let tb = engine.compose(&b).unwrap();
    let ea = ta.get(&sig("shared")).unwrap();
    let eb = tb.get(&sig("shared")).unwrap();
    assert!(ea.implementation.same_body(&eb.implementation));

    let c1 = engine.registry().closure(&RoleId::from("Outer")).unwrap();
    let c2 = engine.registry().closure(&RoleId::from("Outer")).unwrap();
    assert!(Arc::ptr_eq(&c1, &c2));
}
