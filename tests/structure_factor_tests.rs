/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

use approx::assert_relative_eq;
use num_complex::Complex64;
use rstest::rstest;
use sfcalc_rs::crystal::{CrystalError, Vector3D};
use sfcalc_rs::scattering::table::ScatteringTable;
use sfcalc_rs::{
    pack_gradients, Adp, AdpConvention, EngineConfig, EngineError, GradientFlags, MillerIndex,
    ParameterConvention, Scatterer, SiteConvention, SpaceGroup, Structure, StructureFactorEngine,
    UnitCell,
};

type Engine = StructureFactorEngine<Structure>;

fn oblique_cell() -> UnitCell {
    UnitCell::new(5.1, 6.3, 7.2, 84.0, 97.0, 103.0).unwrap()
}

const U_CIF: [f64; 6] = [0.021, 0.026, 0.018, 0.003, -0.002, 0.0015];

/// Three atoms in P-1: isotropic C with explicit anomalous correction,
/// anisotropic O, partially occupied isotropic N
fn test_structure() -> Structure {
    let cell = oblique_cell();
    let group = SpaceGroup::from_xyz(&["x,y,z", "-x,-y,-z"]).unwrap();
    let u_star = cell.u_cif_to_u_star(&U_CIF);
    let mut structure = Structure::new(cell, group);
    structure.add_scatterer(
        Scatterer::new("C1", [0.112, 0.231, 0.347])
            .with_adp(Adp::Iso(0.015))
            .with_anomalous(0.0033, 0.0016),
    );
    structure.add_scatterer(Scatterer::new("O1", [0.291, 0.084, 0.163]).with_adp(Adp::Aniso(u_star)));
    structure.add_scatterer(
        Scatterer::new("N1", [0.417, 0.372, 0.058])
            .with_adp(Adp::Iso(0.022))
            .with_occupancy(0.85),
    );
    structure.set_dispersion("O", 0.011, 0.006);
    structure
}

fn engine_with(config: EngineConfig) -> Engine {
    StructureFactorEngine::new(test_structure(), config).unwrap()
}

/// F(hkl) for a perturbed copy of `base`
fn f_at(engine: &mut Engine, base: &Structure, hkl: MillerIndex, perturb: impl Fn(&mut Structure)) -> Complex64 {
    let mut structure = base.clone();
    perturb(&mut structure);
    *engine.structure_mut() = structure;
    engine.set_indices(vec![hkl]);
    engine.f_calc().unwrap()[0]
}

fn central_difference(
    engine: &mut Engine,
    hkl: MillerIndex,
    step: f64,
    perturb: impl Fn(&mut Structure, f64),
) -> Complex64 {
    let base = engine.structure().clone();
    let plus = f_at(engine, &base, hkl, |s| perturb(s, step));
    let minus = f_at(engine, &base, hkl, |s| perturb(s, -step));
    *engine.structure_mut() = base;
    (plus - minus) / (2.0 * step)
}

fn assert_complex_eq(actual: Complex64, expected: Complex64, tolerance: f64) {
    let scale = expected.norm().max(1.0);
    assert!(
        (actual - expected).norm() <= tolerance * scale,
        "{} != {} (tolerance {})",
        actual,
        expected,
        tolerance
    );
}

fn u_star(structure: &Structure, index: usize) -> [f64; 6] {
    match structure.scatterers[index].adp {
        Adp::Aniso(u) => u,
        Adp::Iso(_) => panic!("atom {} is isotropic", index),
    }
}

#[test]
fn test_f000_sums_weighted_form_factors_and_dispersion() {
    let cell = UnitCell::new(5.0, 5.0, 5.0, 90.0, 90.0, 90.0).unwrap();
    let group = SpaceGroup::from_xyz(&["x,y,z", "-x,-y,-z"]).unwrap();
    let mut structure = Structure::new(cell, group);
    structure.add_scatterer(Scatterer::new("Si1", [0.1, 0.2, 0.3]).with_occupancy(0.5));
    structure.add_scatterer(Scatterer::new("Na1", [0.0, 0.0, 0.0]).with_adp(Adp::Iso(0.02)));
    structure.set_dispersion("Si", 0.2, 0.3);

    let mut engine = StructureFactorEngine::new(structure, EngineConfig::default()).unwrap();
    engine.set_indices(vec![[0, 0, 0]]);
    let f000 = engine.f_calc().unwrap()[0];

    let table = ScatteringTable::it92();
    let si = table.get("Si").unwrap().f0();
    let na = table.get("Na").unwrap().f0();
    // general position: two images at half occupancy; inversion centre: one
    assert_relative_eq!(f000.re, (si + 0.2) + na, epsilon = 1e-10);
    assert_relative_eq!(f000.im, 0.3, epsilon = 1e-10);
}

#[test]
fn test_centrosymmetric_without_dispersion_is_real() {
    let mut structure = test_structure();
    structure.dispersion.clear();
    for scatterer in &mut structure.scatterers {
        scatterer.anomalous = None;
    }
    let mut engine = StructureFactorEngine::new(structure, EngineConfig::default()).unwrap();
    for f in engine.f_calc_d_min(1.5).unwrap() {
        assert_relative_eq!(f.im, 0.0, epsilon = 1e-10);
    }
}

#[test]
fn test_single_reflection_matches_batch() {
    let mut engine = engine_with(EngineConfig::default());
    engine.set_d_min(2.0).unwrap();
    let f_calc = engine.f_calc().unwrap();
    let batch = engine.d_f_calc_d_params().unwrap();
    assert_eq!(batch.len(), f_calc.len());

    let indices = engine.reflections().indices().to_vec();
    for ((hkl, f), derivatives) in indices.iter().zip(&f_calc).zip(&batch) {
        assert_eq!(derivatives.hkl, *hkl);
        assert_eq!(derivatives.structure_factor, *f);
        let single = engine.d_f_calc_hkl_d_params(*hkl).unwrap();
        assert_eq!(&single, derivatives);
    }
}

#[test]
fn test_results_are_deterministic() {
    let mut engine = engine_with(EngineConfig::default());
    engine.set_d_min(1.2).unwrap();
    let gradient: Vec<Complex64> = (0..engine.reflections().len())
        .map(|i| Complex64::new((i as f64 * 0.37).sin(), (i as f64 * 0.11).cos()))
        .collect();

    let first_f = engine.f_calc().unwrap();
    let first_d = engine.d_target_d_params(&gradient).unwrap();
    let second_f = engine.f_calc().unwrap();
    let second_d = engine.d_target_d_params(&gradient).unwrap();
    assert_eq!(first_f, second_f);
    assert_eq!(first_d, second_d);
}

#[rstest]
#[case(0, 0)]
#[case(0, 2)]
#[case(1, 1)]
#[case(2, 0)]
fn test_site_derivatives_match_finite_differences(#[case] atom: usize, #[case] axis: usize) {
    let mut engine = engine_with(EngineConfig::default());
    let hkl = [2, -1, 3];
    let analytic = engine.d_f_calc_hkl_d_params(hkl).unwrap().site[atom][axis];
    let numeric = central_difference(&mut engine, hkl, 1e-6, |s, d| s.scatterers[atom].site[axis] += d);
    assert_complex_eq(analytic, numeric, 1e-6);
}

#[rstest]
#[case(0)]
#[case(2)]
fn test_u_iso_derivative_matches_finite_difference(#[case] atom: usize) {
    let mut engine = engine_with(EngineConfig::default());
    let hkl = [1, 2, -2];
    let analytic = engine.d_f_calc_hkl_d_params(hkl).unwrap().adp[atom][0];
    let numeric = central_difference(&mut engine, hkl, 1e-6, |s, d| {
        if let Adp::Iso(u) = &mut s.scatterers[atom].adp {
            *u += d;
        }
    });
    assert_complex_eq(analytic, numeric, 1e-6);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(4)]
#[case(5)]
fn test_u_star_derivatives_match_finite_differences(#[case] component: usize) {
    let mut engine = engine_with(EngineConfig::default());
    let hkl = [3, 1, -2];
    let derivatives = engine.d_f_calc_hkl_d_params(hkl).unwrap();
    assert_eq!(derivatives.adp[1].len(), 6);
    let analytic = derivatives.adp[1][component];
    let numeric = central_difference(&mut engine, hkl, 1e-7, |s, d| {
        let mut u = u_star(s, 1);
        u[component] += d;
        s.scatterers[1].adp = Adp::Aniso(u);
    });
    assert_complex_eq(analytic, numeric, 1e-5);
}

#[test]
fn test_occupancy_and_dispersion_derivatives() {
    let mut engine = engine_with(EngineConfig::default());
    let hkl = [-1, 2, 1];
    let derivatives = engine.d_f_calc_hkl_d_params(hkl).unwrap();

    let numeric = central_difference(&mut engine, hkl, 1e-6, |s, d| s.scatterers[2].occupancy += d);
    assert_complex_eq(derivatives.occupancy[2], numeric, 1e-6);

    let numeric = central_difference(&mut engine, hkl, 1e-6, |s, d| {
        if let Some(a) = &mut s.scatterers[0].anomalous {
            a.re += d;
        }
    });
    assert_complex_eq(derivatives.fp[0], numeric, 1e-6);

    let numeric = central_difference(&mut engine, hkl, 1e-6, |s, d| {
        if let Some(a) = &mut s.scatterers[0].anomalous {
            a.im += d;
        }
    });
    assert_complex_eq(derivatives.fdp[0], numeric, 1e-6);
    assert_complex_eq(derivatives.fdp[0], Complex64::i() * derivatives.fp[0], 1e-12);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
fn test_cartesian_site_derivatives(#[case] axis: usize) {
    let mut engine = engine_with(EngineConfig::default().with_convention(ParameterConvention::cartesian()));
    let cell = oblique_cell();
    let mut direction = [0.0; 3];
    direction[axis] = 1.0;
    let frac = cell.cartesian_to_fractional(&Vector3D::new(direction[0], direction[1], direction[2]));

    let hkl = [1, -2, 2];
    let analytic = engine.d_f_calc_hkl_d_params(hkl).unwrap().site[1][axis];
    let numeric = central_difference(&mut engine, hkl, 1e-6, |s, d| {
        for (x, f) in s.scatterers[1].site.iter_mut().zip(frac) {
            *x += d * f;
        }
    });
    assert_complex_eq(analytic, numeric, 1e-6);
}

#[rstest]
#[case(AdpConvention::UCif, 0)]
#[case(AdpConvention::UCif, 4)]
#[case(AdpConvention::UCart, 1)]
#[case(AdpConvention::UCart, 3)]
#[case(AdpConvention::UCart, 5)]
fn test_adp_convention_derivatives(#[case] adp: AdpConvention, #[case] component: usize) {
    let convention = ParameterConvention::new(SiteConvention::Fractional, adp);
    let mut engine = engine_with(EngineConfig::default().with_convention(convention));
    let cell = oblique_cell();
    let base = match adp {
        AdpConvention::UCif => U_CIF,
        _ => cell.u_star_to_u_cart(&cell.u_cif_to_u_star(&U_CIF)),
    };

    let hkl = [2, 2, -1];
    let analytic = engine.d_f_calc_hkl_d_params(hkl).unwrap().adp[1][component];
    let numeric = central_difference(&mut engine, hkl, 1e-6, |s, d| {
        let mut u = base;
        u[component] += d;
        let u_star = match adp {
            AdpConvention::UCif => cell.u_cif_to_u_star(&u),
            _ => cell.u_cart_to_u_star(&u),
        };
        s.scatterers[1].adp = Adp::Aniso(u_star);
    });
    assert_complex_eq(analytic, numeric, 1e-5);
}

#[test]
fn test_target_derivatives_match_finite_differences() {
    // T = Σ |F|², so D = 2F
    let mut engine = engine_with(EngineConfig::default());
    engine.set_d_min(2.5).unwrap();
    let indices = engine.reflections().indices().to_vec();
    let f = engine.f_calc().unwrap();
    let gradient: Vec<Complex64> = f.iter().map(|f| 2.0 * *f).collect();
    let analytic = engine.d_target_d_params(&gradient).unwrap();
    assert_eq!(analytic.len(), 3);
    assert_eq!(analytic[1].label, "O1");

    let target = |engine: &mut Engine| -> f64 {
        engine.set_indices(indices.clone());
        engine.f_calc().unwrap().iter().map(|f| f.norm_sqr()).sum()
    };
    let base = engine.structure().clone();
    let step = 1e-6;
    let mut plus = base.clone();
    plus.scatterers[2].site[1] += step;
    let mut minus = base.clone();
    minus.scatterers[2].site[1] -= step;

    *engine.structure_mut() = plus;
    let t_plus = target(&mut engine);
    *engine.structure_mut() = minus;
    let t_minus = target(&mut engine);
    let numeric = (t_plus - t_minus) / (2.0 * step);
    assert_relative_eq!(analytic[2].site[1], numeric, max_relative = 1e-5);
}

#[test]
fn test_target_derivatives_contract_per_reflection_derivatives() {
    let mut engine = engine_with(EngineConfig::default());
    engine.set_d_min(1.8).unwrap();
    let gradient: Vec<Complex64> = (0..engine.reflections().len())
        .map(|i| Complex64::new(0.3 - 0.01 * i as f64, 0.2 + 0.005 * i as f64))
        .collect();
    let target = engine.d_target_d_params(&gradient).unwrap();
    let per_reflection = engine.d_f_calc_d_params().unwrap();

    for (j, atom) in target.iter().enumerate() {
        let expected_occupancy: f64 = per_reflection
            .iter()
            .zip(&gradient)
            .map(|(d, g)| (g.conj() * d.occupancy[j]).re)
            .sum();
        assert_relative_eq!(atom.occupancy, expected_occupancy, max_relative = 1e-10, epsilon = 1e-10);
        for axis in 0..3 {
            let expected: f64 = per_reflection
                .iter()
                .zip(&gradient)
                .map(|(d, g)| (g.conj() * d.site[j][axis]).re)
                .sum();
            assert_relative_eq!(atom.site[axis], expected, max_relative = 1e-10, epsilon = 1e-10);
        }
    }
}

#[test]
fn test_zero_target_gradient_gives_zero_derivatives() {
    let mut engine = engine_with(EngineConfig::default());
    engine.set_d_min(2.0).unwrap();
    let zeros = vec![Complex64::new(0.0, 0.0); engine.reflections().len()];
    for atom in engine.d_target_d_params(&zeros).unwrap() {
        assert_eq!(atom.site, [0.0; 3]);
        assert!(atom.adp.iter().all(|g| *g == 0.0));
        assert_eq!(atom.occupancy, 0.0);
        assert_eq!(atom.fp, 0.0);
        assert_eq!(atom.fdp, 0.0);
    }
}

#[test]
fn test_target_gradient_length_mismatch() {
    let mut engine = engine_with(EngineConfig::default());
    engine.set_indices(vec![[1, 0, 0], [0, 1, 0], [0, 0, 1], [1, 1, 0], [1, 1, 1]]);
    let gradient = vec![Complex64::new(1.0, 0.0); 4];
    assert!(matches!(
        engine.d_target_d_params(&gradient),
        Err(EngineError::DimensionMismatch { expected: 5, actual: 4 })
    ));
}

#[test]
fn test_derivatives_of_other_atoms_are_local() {
    let mut engine = engine_with(EngineConfig::default());
    let hkl = [2, 1, -1];
    let before = engine.d_f_calc_hkl_d_params(hkl).unwrap();

    engine.structure_mut().scatterers[0].site = [0.3, 0.1, 0.45];
    let after = engine.d_f_calc_hkl_d_params(hkl).unwrap();

    assert_ne!(before.site[0], after.site[0]);
    for j in 1..3 {
        assert_eq!(before.site[j], after.site[j]);
        assert_eq!(before.adp[j], after.adp[j]);
        assert_eq!(before.occupancy[j], after.occupancy[j]);
    }
}

#[test]
fn test_selected_flags_leave_other_groups_zero() {
    let mut engine = engine_with(EngineConfig::default());
    engine.set_d_min(2.0).unwrap();
    let gradient = vec![Complex64::new(0.5, -0.25); engine.reflections().len()];
    let full = engine.d_target_d_params(&gradient).unwrap();
    let site_only = GradientFlags {
        site: true,
        ..GradientFlags::none()
    };
    let selected = engine.selected_d_target_d_params(&gradient, site_only).unwrap();

    for (full, selected) in full.iter().zip(&selected) {
        assert_eq!(full.site, selected.site);
        assert!(selected.adp.iter().all(|g| *g == 0.0));
        assert_eq!(selected.occupancy, 0.0);
        assert_eq!(selected.fp, 0.0);
    }

    let packed = pack_gradients(&selected, &[site_only; 3]).unwrap();
    assert_eq!(packed.len(), 9);
    assert_eq!(packed[3..6], selected[1].site);
}

#[test]
fn test_scoped_convention_is_restored() {
    let mut engine = engine_with(EngineConfig::default());
    engine.set_d_min(2.0).unwrap();
    let gradient = vec![Complex64::new(1.0, 0.5); engine.reflections().len()];

    let scoped = engine
        .d_target_d_params_in(&gradient, ParameterConvention::cartesian())
        .unwrap();
    assert_eq!(engine.calculator().convention(), ParameterConvention::default());

    let mut cartesian = engine_with(EngineConfig::default().with_convention(ParameterConvention::cartesian()));
    cartesian.set_d_min(2.0).unwrap();
    let expected = cartesian.d_target_d_params(&gradient).unwrap();
    assert_eq!(scoped, expected);

    // a failing call restores the convention too
    assert!(engine
        .d_target_d_params_in(&gradient[1..], ParameterConvention::cartesian())
        .is_err());
    assert_eq!(engine.calculator().convention(), ParameterConvention::default());
}

#[test]
fn test_structure_edits_are_picked_up() {
    let mut engine = engine_with(EngineConfig::default());
    engine.set_indices(vec![[1, 1, 1]]);
    let before = engine.f_calc().unwrap()[0];
    let revision = engine.crystal().revision();

    engine.structure_mut().scatterers[1].occupancy = 0.5;
    engine.structure_mut().set_dispersion("O", 0.5, 0.4);
    let after = engine.f_calc().unwrap()[0];
    assert_ne!(before, after);
    assert!(engine.crystal().revision() > revision);
    assert_eq!(engine.calculator().anomalous()[1], Complex64::new(0.5, 0.4));
    assert_eq!(engine.calculator().anomalous_revision(), Some(engine.crystal().revision()));
}

#[test]
fn test_cell_edits_are_picked_up() {
    let mut engine = engine_with(EngineConfig::default());
    engine.set_indices(vec![[1, 1, 1], [2, 0, -1]]);
    let before = engine.f_calc().unwrap();

    let cubic = UnitCell::new(10.0, 10.0, 10.0, 90.0, 90.0, 90.0).unwrap();
    engine.structure_mut().unit_cell = cubic.clone();
    let after = engine.f_calc().unwrap();
    assert_relative_eq!(engine.crystal().unit_cell().volume(), 1000.0, epsilon = 1e-9);

    let mut structure = test_structure();
    structure.unit_cell = cubic;
    let mut fresh = StructureFactorEngine::new(structure, EngineConfig::default()).unwrap();
    fresh.set_indices(vec![[1, 1, 1], [2, 0, -1]]);
    let expected = fresh.f_calc().unwrap();

    for ((b, a), e) in before.iter().zip(&after).zip(&expected) {
        assert!((a - b).norm() > 1e-6);
        assert_complex_eq(*a, *e, 1e-12);
    }
}

#[test]
fn test_resolution_set_follows_cell_and_symmetry() {
    let mut engine = engine_with(EngineConfig::default());
    let coarse = engine.f_calc_d_min(2.0).unwrap().len();

    engine.structure_mut().unit_cell = UnitCell::new(10.0, 10.0, 10.0, 90.0, 90.0, 90.0).unwrap();
    engine.structure_mut().space_group = SpaceGroup::from_xyz(&["x,y,z", "-x,-y,-z", "-x,y+1/2,-z", "x,-y+1/2,z"]).unwrap();
    let f = engine.f_calc().unwrap();
    assert_eq!(f.len(), engine.reflections().len());
    assert!(engine.reflections().len() > coarse);
    assert!(!engine.reflections().indices().contains(&[0, 1, 0]));
    assert!(engine.reflections().indices().contains(&[5, 0, 0]));
    assert_eq!(engine.reflections().d_min(), Some(2.0));

    // explicit lists are never regenerated
    engine.set_indices(vec![[0, 1, 0]]);
    engine.structure_mut().unit_cell = oblique_cell();
    assert_eq!(engine.f_calc().unwrap().len(), 1);
}

#[test]
fn test_changed_atom_list_is_rejected() {
    let mut engine = engine_with(EngineConfig::default());
    engine.set_indices(vec![[1, 0, 0]]);
    engine
        .structure_mut()
        .add_scatterer(Scatterer::new("H1", [0.0, 0.0, 0.0]));
    assert!(matches!(
        engine.f_calc(),
        Err(EngineError::Crystal(CrystalError::StructureInconsistent(_)))
    ));
}

#[test]
fn test_f_calc_d_min_generates_reflections() {
    let mut engine = engine_with(EngineConfig::default());
    let f = engine.f_calc_d_min(2.0).unwrap();
    assert_eq!(f.len(), engine.reflections().len());
    assert_eq!(engine.reflections().d_min(), Some(2.0));
    assert!(engine
        .reflections()
        .iter()
        .all(|hkl| oblique_cell().d_spacing(hkl) >= 2.0 - 1e-9));
    assert!(matches!(engine.f_calc_d_min(0.0), Err(EngineError::Reflection(_))));
}

#[test]
fn test_unknown_table_is_rejected() {
    assert!(matches!(
        StructureFactorEngine::new(test_structure(), EngineConfig::default().with_table("waasmaier")),
        Err(EngineError::Scattering(_))
    ));
}
