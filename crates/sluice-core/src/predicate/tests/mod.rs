
use crate::{
    predicate::{
        CombinedPredicate, FieldPredicate, Inclusion, LogicalKind, Operand, Predicate,
        PredicateKind,
    },
    test_support::{AGE, NAME, person},
    value::Value,
};

fn field(kind: PredicateKind, operand: Operand) -> Predicate {
    Predicate::Field(FieldPredicate::new("age", kind, operand).expect("valid shape"))
}

#[test]
fn negation_follows_pairing_table() {
    let pairs = [
        (PredicateKind::Equal, PredicateKind::NotEqual),
        (PredicateKind::GreaterThan, PredicateKind::LessOrEqual),
        (PredicateKind::GreaterOrEqual, PredicateKind::LessThan),
        (PredicateKind::Between, PredicateKind::NotBetween),
        (PredicateKind::In, PredicateKind::NotIn),
    ];

    for (kind, partner) in pairs {
        assert_eq!(kind.negate(), partner);
        assert_eq!(partner.negate(), kind);
    }
}

#[test]
fn negate_greater_than_is_less_or_equal_over_same_operand() {
    let predicate = AGE.greater_than(18);

    assert_eq!(predicate.negate(), AGE.less_or_equal(18));
    assert_eq!(predicate.negate().negate(), predicate);
}

#[test]
fn negation_keeps_range_and_set_operands() {
    let range = AGE.between_with(10, 20, Inclusion::StartExclusiveEndInclusive);
    let negated = range.negate();

    let Predicate::Field(inner) = &negated else {
        panic!("expected field predicate");
    };
    assert_eq!(inner.kind(), PredicateKind::NotBetween);
    assert_eq!(
        inner.operand(),
        &Operand::Range {
            start: Value::Int(10),
            end: Value::Int(20),
            inclusion: Inclusion::StartExclusiveEndInclusive,
        }
    );

    assert_eq!(AGE.in_values([1, 2, 3]).negate(), AGE.not_in([1, 2, 3]));
}

#[test]
fn de_morgan_swaps_combinator_and_negates_children() {
    let p1 = AGE.greater_than(18);
    let p2 = NAME.equal("A");

    let and = p1.clone().and(p2.clone());
    let or = p1.clone().or(p2.clone());

    assert_eq!(
        and.negate(),
        Predicate::any([p1.negate(), p2.negate()]).expect("non-empty")
    );
    assert_eq!(
        or.negate(),
        Predicate::all([p1.negate(), p2.negate()]).expect("non-empty")
    );
}

#[test]
fn negation_does_not_touch_the_original_tree() {
    let original = AGE.greater_than(18).and(NAME.equal("A"));
    let snapshot = original.clone();

    let _ = original.negate();
    let _ = !original.clone();

    assert_eq!(original, snapshot);
}

#[test]
fn and_extends_existing_conjunction_in_order() {
    let predicate = AGE.greater_than(1).and(AGE.less_than(9)).and(NAME.equal("A"));

    let Predicate::Combined(combined) = predicate else {
        panic!("expected combined predicate");
    };
    assert_eq!(combined.kind(), LogicalKind::And);
    assert_eq!(
        combined.children(),
        &[AGE.greater_than(1), AGE.less_than(9), NAME.equal("A")]
    );
}

#[test]
fn or_of_and_nests_instead_of_flattening() {
    let predicate = AGE.greater_than(1).and(AGE.less_than(9)).or(NAME.equal("A"));

    let Predicate::Combined(combined) = predicate else {
        panic!("expected combined predicate");
    };
    assert_eq!(combined.kind(), LogicalKind::Or);
    assert_eq!(combined.children().len(), 2);
}

#[test]
fn single_child_combination_is_preserved_but_behaves_like_child() {
    let child = AGE.greater_than(18);
    let single = Predicate::all([child.clone()]).expect("non-empty");

    assert!(matches!(single, Predicate::Combined(_)));

    for age in [None, Some(5), Some(18), Some(40)] {
        let entity = person(1, "A", age);
        assert_eq!(single.evaluate(&entity), child.evaluate(&entity));
        assert_eq!(single.negate().evaluate(&entity), child.negate().evaluate(&entity));
    }
}

#[test]
fn empty_combination_is_rejected() {
    let err = CombinedPredicate::new(LogicalKind::Or, Vec::new()).expect_err("empty");

    assert!(err.message.contains("at least one child"));
}

#[test]
fn kind_and_operand_shape_must_agree() {
    let err = FieldPredicate::new("age", PredicateKind::Between, Operand::Value(Value::Int(1)))
        .expect_err("shape mismatch");

    assert!(err.message.contains("BETWEEN"));
}

#[test]
fn range_inclusion_is_honoured() {
    let inclusive = field(
        PredicateKind::Between,
        Operand::Range {
            start: Value::Int(10),
            end: Value::Int(20),
            inclusion: Inclusion::StartInclusiveEndInclusive,
        },
    );
    let exclusive = AGE.between_with(10, 20, Inclusion::StartExclusiveEndExclusive);

    assert!(inclusive.test(&person(1, "A", Some(10))));
    assert!(inclusive.test(&person(1, "A", Some(20))));
    assert!(!exclusive.test(&person(1, "A", Some(10))));
    assert!(!exclusive.test(&person(1, "A", Some(20))));
    assert!(exclusive.test(&person(1, "A", Some(15))));

    let default = AGE.between(10, 20);
    assert!(default.test(&person(1, "A", Some(10))));
    assert!(!default.test(&person(1, "A", Some(20))));
}

#[test]
fn null_fields_are_unknown_for_every_kind() {
    let nobody = person(1, "A", None);

    for predicate in [
        AGE.equal(1),
        AGE.not_equal(1),
        AGE.greater_than(1),
        AGE.less_or_equal(1),
        AGE.between(1, 5),
        AGE.not_between(1, 5),
        AGE.in_values([1, 2]),
        AGE.not_in([1, 2]),
    ] {
        assert_eq!(predicate.evaluate(&nobody), None, "{predicate:?}");
        assert!(!predicate.test(&nobody));
    }
}

#[test]
fn kleene_logic_short_circuits_around_unknowns() {
    let nobody = person(1, "A", None);

    let and_false = AGE.greater_than(1).and(NAME.equal("B"));
    let or_true = AGE.greater_than(1).or(NAME.equal("A"));
    let and_unknown = AGE.greater_than(1).and(NAME.equal("A"));

    assert_eq!(and_false.evaluate(&nobody), Some(false));
    assert_eq!(or_true.evaluate(&nobody), Some(true));
    assert_eq!(and_unknown.evaluate(&nobody), None);
}

#[test]
fn membership_keeps_list_order() {
    let Predicate::Field(predicate) = NAME.in_values(["c", "a", "b"]) else {
        panic!("expected field predicate");
    };

    assert_eq!(
        predicate.operand(),
        &Operand::Set(vec![
            Value::Text("c".to_string()),
            Value::Text("a".to_string()),
            Value::Text("b".to_string()),
        ])
    );
    assert!(predicate.evaluate(&person(1, "a", None)) == Some(true));
    assert!(predicate.evaluate(&person(1, "z", None)) == Some(false));
}
