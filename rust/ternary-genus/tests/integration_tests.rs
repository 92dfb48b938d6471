use std::collections::BTreeMap;
use std::num::Wrapping;

use num_bigint::BigInt;

use ternary_genus::{
    AnyGenus, Genus, GenusConfig, GenusError, NeighborIsometry, Precision, PrimeSymbol, QuadForm,
    W64,
};

fn symbols(primes: &[(u64, bool)]) -> Vec<PrimeSymbol> {
    primes.iter().map(|&(p, r)| PrimeSymbol::new(p, r)).collect()
}

fn genus(primes: &[(u64, bool)], seed: u64) -> Genus<BigInt> {
    Genus::from_symbols(&symbols(primes), &GenusConfig::with_seed(seed)).unwrap()
}

fn big(n: i64) -> BigInt {
    BigInt::from(n)
}

/// Sum of 48 / |Aut(q)| over the representatives.
fn weighted_count(g: &Genus<BigInt>) -> BigInt {
    g.representatives()
        .iter()
        .map(|r| BigInt::from(48 / r.q.num_automorphisms().unwrap()))
        .sum()
}

#[test]
fn test_mass_matches_enumeration() {
    let cases: Vec<Vec<(u64, bool)>> = vec![
        vec![(2, true)],
        vec![(3, true)],
        vec![(11, true)],
        vec![(37, true)],
        vec![(101, true)],
        vec![(2, true), (3, false), (5, false)],
        vec![(3, true), (5, false), (7, false)],
    ];
    for primes in cases {
        let g = genus(&primes, 7);
        assert_eq!(
            &weighted_count(&g),
            g.mass_x24(),
            "mass mismatch for symbols {:?}",
            primes
        );
    }
}

#[test]
fn test_level_11_scenario() {
    let g = genus(&[(11, true)], 1);
    assert_eq!(g.size(), 2);
    assert_eq!(g.mass_x24(), &big(10));

    let dims = g.dimension_map();
    let expected: BTreeMap<BigInt, usize> = [(big(1), 2), (big(11), 0)].into_iter().collect();
    assert_eq!(dims, expected);

    let t2 = g.hecke_matrix_dense_at(2, &big(1)).unwrap();
    let t3 = g.hecke_matrix_dense_at(3, &big(1)).unwrap();
    assert_eq!(t2.trace(), 1);
    assert_eq!(t2.row_sums(), vec![3, 3]);
    assert_eq!(t3.trace(), 3);
    assert_eq!(t3.row_sums(), vec![4, 4]);
    assert_eq!(g.hecke_matrix_dense_at(2, &big(11)).unwrap().dim, 0);
}

#[test]
fn test_level_37_scenario() {
    let g = genus(&[(37, true)], 3);
    assert_eq!(g.size(), 2);
    assert_eq!(g.mass_x24(), &big(36));
    assert_eq!(g.dimension_map()[&big(37)], 1);

    let t2 = g.hecke_matrix_dense_at(2, &big(37)).unwrap();
    let t3 = g.hecke_matrix_dense_at(3, &big(37)).unwrap();
    assert_eq!(t2.to_rows(), vec![vec![-2]]);
    assert_eq!(t3.to_rows(), vec![vec![-3]]);

    let trivial = g.hecke_matrix_dense_at(2, &big(1)).unwrap();
    assert_eq!(trivial.trace(), 3);
    assert_eq!(trivial.row_sums(), vec![3, 3]);
}

#[test]
fn test_trivial_conductor_row_sums() {
    let g = genus(&[(101, true)], 11);
    assert_eq!(g.size(), 8);
    for p in [2u64, 3, 5, 7] {
        let t = g.hecke_matrix_dense_at(p, &big(1)).unwrap();
        assert!(
            t.row_sums().iter().all(|&s| s == p as i64 + 1),
            "T_{} row sums {:?}",
            p,
            t.row_sums()
        );
    }
}

#[test]
fn test_hecke_operators_commute() {
    for primes in [vec![(101u64, true)], vec![(3, true), (5, false), (7, false)]] {
        let g = genus(&primes, 5);
        let t2 = g.hecke_matrix_dense(2).unwrap();
        let t11 = g.hecke_matrix_dense(11).unwrap();
        for (conductor, m) in t2.iter() {
            assert!(
                m.commutes_with(&t11[conductor]),
                "T_2 and T_11 do not commute on conductor {} for {:?}",
                conductor,
                primes
            );
        }
    }
}

#[test]
fn test_dense_and_sparse_agree() {
    let g = genus(&[(3, true), (5, false), (7, false)], 9);
    for p in [2u64, 11] {
        let dense = g.hecke_matrix_dense(p).unwrap();
        let sparse = g.hecke_matrix_sparse(p).unwrap();
        assert_eq!(dense.len(), sparse.len());
        for (conductor, m) in dense.iter() {
            assert_eq!(&sparse[conductor].to_dense(), m);
            assert_eq!(sparse[conductor].nnz(), m.nnz());
        }
    }
}

#[test]
fn test_nontrivial_character_level_30() {
    let g = genus(&[(2, true), (3, false), (5, false)], 2);
    assert_eq!(g.size(), 1);
    let t7 = g.hecke_matrix_dense_at(7, &big(6)).unwrap();
    let t11 = g.hecke_matrix_dense_at(11, &big(6)).unwrap();
    assert_eq!(t7.to_rows(), vec![vec![-4]]);
    assert_eq!(t11.to_rows(), vec![vec![0]]);
}

#[test]
fn test_nontrivial_character_level_210() {
    let g = genus(&[(2, true), (3, true), (5, true), (7, false)], 4);
    let t11 = g.hecke_matrix_dense_at(11, &big(21)).unwrap();
    let t13 = g.hecke_matrix_dense_at(13, &big(21)).unwrap();
    assert_eq!(t11.trace(), 4);
    assert_eq!(t13.trace(), -2);
}

#[test]
fn test_same_seed_reproduces_results() {
    let a = genus(&[(3, true), (5, false), (7, false)], 42);
    let b = genus(&[(3, true), (5, false), (7, false)], 42);
    assert_eq!(a.representatives(), b.representatives());
    assert_eq!(*a.hecke_matrix_dense(2).unwrap(), *b.hecke_matrix_dense(2).unwrap());
}

#[test]
fn test_fixed_and_arbitrary_agree() {
    let primes = [(3u64, true), (5, false), (7, false)];
    let arbitrary = genus(&primes, 13);
    let fixed: Genus<W64> =
        Genus::from_symbols(&symbols(&primes), &GenusConfig::with_seed(13)).unwrap();
    assert_eq!(fixed.size(), arbitrary.size());
    for (f, a) in fixed.representatives().iter().zip(arbitrary.representatives()) {
        assert_eq!(f.q.to_big(), a.q);
    }

    let fixed_t2 = fixed.hecke_matrix_dense(2).unwrap();
    let arbitrary_t2 = arbitrary.hecke_matrix_dense(2).unwrap();
    for (conductor, m) in arbitrary_t2.iter() {
        let key = Wrapping(i64::try_from(conductor).unwrap());
        assert_eq!(&fixed_t2[&key], m);
    }
}

#[test]
fn test_any_genus_reports_bigint_keys() {
    let mut config = GenusConfig::with_seed(21);
    config.precision = Precision::Fixed;
    let mut g = AnyGenus::build(&symbols(&[(11, true)]), &config).unwrap();
    assert_eq!(g.precision(), Precision::Fixed);
    assert_eq!(g.size(), 2);
    let t2 = g.hecke_matrix_dense(2).unwrap();
    assert_eq!(t2[&big(1)].trace(), 1);

    let promoted = g.promote().unwrap();
    assert_eq!(promoted.precision(), Precision::Arbitrary);
    assert_eq!(promoted.forms().len(), 2);
}

#[test]
fn test_hecke_prime_dividing_discriminant() {
    let g = genus(&[(3, true), (5, false), (7, false)], 1);
    for p in [3u64, 5, 7] {
        assert!(matches!(
            g.hecke_matrix_dense(p),
            Err(GenusError::PrimeDividesDiscriminant { .. })
        ));
    }
}

#[test]
fn test_too_many_prime_symbols() {
    let mut primes = Vec::new();
    let mut p = 1;
    while primes.len() < 64 {
        p = genus_arith::next_prime(p);
        primes.push(PrimeSymbol::new(p, primes.is_empty()));
    }
    let err = Genus::<BigInt>::from_symbols(&primes, &GenusConfig::with_seed(1)).unwrap_err();
    assert!(matches!(err, GenusError::TooManyPrimes(64)));
}

#[test]
fn test_even_ramified_count_rejected() {
    let err = Genus::<BigInt>::from_symbols(
        &symbols(&[(2, true), (3, true)]),
        &GenusConfig::with_seed(1),
    )
    .unwrap_err();
    assert!(matches!(err, GenusError::InvalidSymbols(_)));
}

#[test]
fn test_from_form_matches_from_symbols() {
    let q: QuadForm<BigInt> = QuadForm::from_ints([2, 2, 3, 0, 2, 1]);
    let g = Genus::from_form(&q, &symbols(&[(37, true)]), &GenusConfig::with_seed(8)).unwrap();
    assert_eq!(g.size(), 2);
    assert_eq!(g.mass_x24(), &big(36));
    assert!(g.index_of(&q).unwrap().is_some());
}

#[test]
fn test_neighbor_isometries_are_isometries() {
    let g = genus(&[(37, true)], 6);
    let items: Vec<NeighborIsometry<BigInt>> = g
        .neighbor_isometries(2)
        .unwrap()
        .collect::<ternary_genus::Result<_>>()
        .unwrap();
    assert_eq!(items.len(), g.size() * 3);
    for item in &items {
        assert!(item
            .isometry
            .is_isometry(g.mother(), g.mother(), &item.denominator));
    }
}

#[test]
fn test_config_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("genus.json");
    std::fs::write(&path, r#"{ "seed": 77, "precision": "fixed" }"#).unwrap();

    let config = GenusConfig::load(&path).unwrap();
    assert_eq!(config.seed, 77);
    assert_eq!(config.precision, Precision::Fixed);
    assert!(config.validate);

    let g = AnyGenus::build(&symbols(&[(11, true)]), &config).unwrap();
    assert_eq!(g.seed(), 77);
}

fn fixed_config(seed: u64, promote_on_overflow: bool) -> GenusConfig {
    GenusConfig {
        seed,
        precision: Precision::Fixed,
        promote_on_overflow,
        ..Default::default()
    }
}

#[test]
fn test_fixed_width_overflow_is_reported() {
    let fixed: Genus<W64> =
        Genus::from_symbols(&symbols(&[(11, true)]), &fixed_config(1, false)).unwrap();
    let err = fixed.hecke_matrix_dense(10007).unwrap_err();
    assert!(err.is_overflow(), "expected overflow, got {}", err);

    let mut any = AnyGenus::build(&symbols(&[(11, true)]), &fixed_config(1, false)).unwrap();
    assert!(matches!(any.hecke_matrix_dense(10007), Err(GenusError::Overflow(_))));
    assert_eq!(any.precision(), Precision::Fixed);
}

#[test]
fn test_overflow_promotes_to_arbitrary_precision() {
    let mut any = AnyGenus::build(&symbols(&[(11, true)]), &fixed_config(1, true)).unwrap();
    assert_eq!(any.precision(), Precision::Fixed);
    let promoted = any.hecke_matrix_dense(10007).unwrap();
    assert_eq!(any.precision(), Precision::Arbitrary);

    let exact = genus(&[(11, true)], 1);
    let expected = exact.hecke_matrix_dense(10007).unwrap();
    assert_eq!(promoted, *expected);
    assert_eq!(promoted[&big(1)].row_sums(), vec![10008, 10008]);
}

#[test]
fn test_expansion_guard_stops_enumeration() {
    let config = GenusConfig {
        seed: 1,
        max_expansion_primes: 0,
        ..Default::default()
    };
    let err = Genus::<BigInt>::from_symbols(&symbols(&[(101, true)]), &config).unwrap_err();
    assert!(matches!(err, GenusError::Consistency(_)), "got {}", err);
}
