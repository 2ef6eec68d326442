//! End-to-end scenarios against the public API, one per example in spec.md
//! §8 (S1-S6), plus a couple of cross-module checks that don't fit neatly
//! into a single unit test file.

use std::sync::Arc;

use shapectr::{ConstraintSet, Decision};

use shapectr::expr::{BoolExpr, NumExpr, Operand, ShapeExpr};

#[test]
fn s1_range_narrowing_and_immediate_checks() {
    let root = ConstraintSet::root();
    let (x, s1) = root.gen_sym_int_gte("x", 0);
    let (y, s2) = s1.gen_sym_int_gte("y", 3);

    let lt_xy = s2.gen_num_compare(Arc::new(NumExpr::symbol(x.clone())), Arc::new(NumExpr::symbol(y)), false);
    assert_eq!(s2.check_immediate(&lt_xy), Decision::Unknown);

    let lt_neg1_x = s2.gen_num_compare(Arc::new(NumExpr::int(-1)), Arc::new(NumExpr::symbol(x)), false);
    assert_eq!(s2.check_immediate(&lt_neg1_x), Decision::True);
}

#[test]
fn s2_soft_obligations_never_narrow_caches() {
    let root = ConstraintSet::root();
    let (x, s1) = root.gen_sym_int_gte("x", 0);
    let eq = s1.gen_equality(
        Operand::Num(Arc::new(NumExpr::symbol(x.clone()))),
        Operand::Num(Arc::new(NumExpr::int(5))),
    );
    let s2 = s1.require(&eq);
    assert_eq!(s2.valid(), Some(true));
    assert!(s2.get_cached_range(&NumExpr::symbol(x)).and_then(|r| r.is_const()).is_none());
}

#[test]
fn s3_hard_facts_narrow_to_a_point() {
    let root = ConstraintSet::root();
    let (x, s1) = root.gen_sym_int_gte("x", 0);
    let eq = s1.gen_equality(
        Operand::Num(Arc::new(NumExpr::symbol(x.clone()))),
        Operand::Num(Arc::new(NumExpr::int(5))),
    );
    let s2 = s1.guarantee(&eq);
    assert_eq!(s2.get_cached_range(&NumExpr::symbol(x)).and_then(|r| r.is_const()), Some(5.0));
}

#[test]
fn s4_broadcast_compatibility() {
    let root = ConstraintSet::root();
    let a = Arc::new(ShapeExpr::konst(vec![
        Arc::new(NumExpr::int(1)),
        Arc::new(NumExpr::int(3)),
        Arc::new(NumExpr::int(1)),
    ]));
    let ok = Arc::new(ShapeExpr::konst(vec![
        Arc::new(NumExpr::int(4)),
        Arc::new(NumExpr::int(1)),
        Arc::new(NumExpr::int(5)),
    ]));
    let bad = Arc::new(ShapeExpr::konst(vec![
        Arc::new(NumExpr::int(4)),
        Arc::new(NumExpr::int(2)),
        Arc::new(NumExpr::int(5)),
    ]));

    assert_eq!(root.check_immediate(&root.gen_broad(Arc::clone(&a), ok)), Decision::True);
    assert_eq!(root.check_immediate(&root.gen_broad(a, bad)), Decision::False);
}

#[test]
fn s5_bool_to_int_round_trip_constant_folds() {
    let root = ConstraintSet::root();
    let (n, s1) = root.cast_bool_to_int(Arc::new(BoolExpr::Const(true)));
    assert_eq!(s1.get_cached_range(&n).and_then(|r| r.is_const()), Some(1.0));

    let (n0, s2) = root.cast_bool_to_int(Arc::new(BoolExpr::Const(false)));
    assert_eq!(s2.get_cached_range(&n0).and_then(|r| r.is_const()), Some(0.0));
}

#[test]
fn s6_a_contradiction_marks_the_set_invalid() {
    let root = ConstraintSet::root();
    let eq = root.gen_equality(
        Operand::Num(Arc::new(NumExpr::int(1))),
        Operand::Num(Arc::new(NumExpr::int(2))),
    );
    let s1 = root.guarantee(&eq);
    assert_eq!(s1.valid(), Some(false));
}

#[test]
fn forked_snapshots_do_not_see_each_others_narrowing() {
    let root = ConstraintSet::root();
    let (x, s1) = root.gen_sym_int_gte("x", 0);

    let eq5 = s1.gen_equality(
        Operand::Num(Arc::new(NumExpr::symbol(x.clone()))),
        Operand::Num(Arc::new(NumExpr::int(5))),
    );
    let eq9 = s1.gen_equality(
        Operand::Num(Arc::new(NumExpr::symbol(x.clone()))),
        Operand::Num(Arc::new(NumExpr::int(9))),
    );

    let branch_a = s1.guarantee(&eq5);
    let branch_b = s1.guarantee(&eq9);

    assert_eq!(branch_a.get_cached_range(&NumExpr::symbol(x.clone())).and_then(|r| r.is_const()), Some(5.0));
    assert_eq!(branch_b.get_cached_range(&NumExpr::symbol(x)).and_then(|r| r.is_const()), Some(9.0));
    assert_eq!(branch_a.valid(), Some(true));
    assert_eq!(branch_b.valid(), Some(true));
}

#[test]
fn pool_count_is_monotone_across_installers() {
    let root = ConstraintSet::root();
    let (x, s1) = root.gen_sym_int_gte("x", 0);
    let before = s1.count();
    let eq = s1.gen_equality(
        Operand::Num(Arc::new(NumExpr::symbol(x))),
        Operand::Num(Arc::new(NumExpr::int(5))),
    );
    let s2 = s1.guarantee(&eq);
    assert!(s2.count() >= before);
}

#[test]
fn json_bundle_round_trips_through_serde_json() {
    use shapectr::printer::get_constraint_json;

    let root = ConstraintSet::root();
    let (x, s1) = root.gen_sym_int_gte("x", 0);
    let eq = s1.gen_equality(
        Operand::Num(Arc::new(NumExpr::symbol(x))),
        Operand::Num(Arc::new(NumExpr::int(5))),
    );
    let s2 = s1.require(&eq);

    let json = get_constraint_json(&s2).expect("serialization cannot fail for this DTO");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
    assert!(value.get("ctrPool").is_some());
    assert!(value.get("hardCtr").is_some());
    assert!(value.get("softCtr").is_some());
    assert!(value.get("pathCtr").is_some());
}
