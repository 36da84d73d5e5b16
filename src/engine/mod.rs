/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Structure-factor engine
//!
//! The engine owns the host structure, a [`CrystalModel`] synchronized from
//! it, the scattering calculator and the reflection list. Every compute call
//! first refreshes the crystal from the structure, pushes the new anomalous
//! corrections into the calculator and only then evaluates, so edits made
//! through [`StructureFactorEngine::structure_mut`] are always picked up.

pub mod accumulate;
pub mod config;
pub mod derivatives;
pub mod errors;

pub use accumulate::{accumulate, GradientSink};
pub use config::EngineConfig;
pub use derivatives::{pack_gradients, FCalcDerivatives, GradientFlags, TargetDerivatives};
pub use errors::{EngineError, Result};

use crate::crystal::model::CrystalModel;
use crate::crystal::structure::StructureSource;
use crate::reflections::{MillerIndex, ReflectionSet};
use crate::scattering::calculator::{FCalcMethod, ScatteringCalculator};
use crate::scattering::convention::ParameterConvention;
use crate::scattering::table::ScatteringTable;
use crate::scattering::taam::Databank;
use derivatives::TargetAccumulator;
use log::{debug, info};
use num_complex::Complex64;
use rayon::prelude::*;
use std::path::Path;

/// Computes structure factors and their derivatives for one crystal
pub struct StructureFactorEngine<S: StructureSource> {
    structure: S,
    config: EngineConfig,
    table: ScatteringTable,
    crystal: CrystalModel,
    calculator: ScatteringCalculator,
    reflections: ReflectionSet,
}

/// Value and derivatives of one reflection, shared by the batch and single
/// reflection entry points
fn reflection_derivatives(
    crystal: &CrystalModel,
    calculator: &ScatteringCalculator,
    hkl: &MillerIndex,
) -> Result<FCalcDerivatives> {
    let mut sink = GradientSink::new(crystal, GradientFlags::all());
    let f = accumulate(crystal, calculator, hkl, Some(&mut sink))?;
    Ok(FCalcDerivatives::from_sink(
        *hkl,
        f,
        sink,
        crystal,
        &calculator.convention(),
    ))
}

/// Reverse-mode contraction of per-reflection target gradients
fn contract(
    crystal: &CrystalModel,
    calculator: &ScatteringCalculator,
    reflections: &ReflectionSet,
    target_gradient: &[Complex64],
    flags: GradientFlags,
) -> Result<Vec<TargetDerivatives>> {
    let mut sink = GradientSink::new(crystal, flags);
    let mut totals = TargetAccumulator::new(crystal);
    for (hkl, d) in reflections.iter().zip(target_gradient) {
        sink.reset();
        accumulate(crystal, calculator, hkl, Some(&mut sink))?;
        totals.add(*d, &sink);
    }
    Ok(totals.finish(crystal, &calculator.convention()))
}

impl<S: StructureSource> StructureFactorEngine<S> {
    /// Read `structure` and prepare the configured scattering model
    ///
    /// With [`FCalcMethod::Taam`] atom types are assigned immediately, so an
    /// untypeable structure fails here rather than at the first computation.
    pub fn new(structure: S, config: EngineConfig) -> Result<Self> {
        let table_name = config
            .table
            .clone()
            .or_else(|| structure.scattering_table().map(str::to_string));
        let table = match table_name {
            Some(name) => ScatteringTable::named(&name)?,
            None => ScatteringTable::default(),
        };

        let crystal = CrystalModel::initialize(&structure, &table)?;
        let mut calculator = ScatteringCalculator::iam(&crystal, &table)?;
        calculator.set_convention(config.convention);

        let mut engine = Self {
            structure,
            config,
            table,
            crystal,
            calculator,
            reflections: ReflectionSet::new(),
        };

        if engine.config.method == FCalcMethod::Taam {
            let databank = engine.config.databank.clone();
            let log_assignment = engine.config.log_assignment;
            engine.assign_atom_types(databank.as_deref(), log_assignment)?;
        }
        engine.update_calculator()?;

        info!(
            "Structure factor engine ready: {} atoms, {} model, table {}",
            engine.crystal.atom_count(),
            engine.calculator.method(),
            engine.table.name()
        );
        Ok(engine)
    }

    pub fn structure(&self) -> &S {
        &self.structure
    }

    /// Mutable access to the host structure; changes are picked up by the
    /// next compute call
    pub fn structure_mut(&mut self) -> &mut S {
        &mut self.structure
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn crystal(&self) -> &CrystalModel {
        &self.crystal
    }

    pub fn calculator(&self) -> &ScatteringCalculator {
        &self.calculator
    }

    pub fn reflections(&self) -> &ReflectionSet {
        &self.reflections
    }

    pub fn method(&self) -> FCalcMethod {
        self.calculator.method()
    }

    /// Report of the last TAAM assignment, when one was requested
    pub fn assignment_log(&self) -> Option<&str> {
        self.calculator.assignment_log()
    }

    /// Use an explicit reflection list, kept verbatim
    pub fn set_indices(&mut self, indices: Vec<MillerIndex>) {
        self.reflections.set_explicit(indices);
    }

    /// Generate all reflections to resolution `d_min`
    pub fn set_d_min(&mut self, d_min: f64) -> Result<()> {
        self.reflections
            .set_resolution(d_min, self.crystal.unit_cell(), self.crystal.space_group())?;
        Ok(())
    }

    /// Type every atom against a databank file, or the built-in databank
    ///
    /// Returns the assignment report when `log_assignment` is set. The
    /// typing must be repeated if the connectivity of the structure changes.
    pub fn assign_atom_types(
        &mut self,
        databank: Option<&Path>,
        log_assignment: bool,
    ) -> Result<Option<String>> {
        self.crystal.refresh(&self.structure)?;
        let databank = match databank {
            Some(path) => Databank::from_file(path)?,
            None => Databank::builtin()?,
        };
        let log = self
            .calculator
            .assign_atom_types(&self.crystal, databank, log_assignment)?
            .map(str::to_string);
        if let Some(report) = &log {
            info!("Atom type assignment:\n{}", report);
        }
        self.update_calculator()?;
        Ok(log)
    }

    /// Push the crystal's current anomalous corrections and geometry into
    /// the calculator
    pub fn update_calculator(&mut self) -> Result<()> {
        self.crystal.check_alignment()?;
        self.calculator
            .set_anomalous(self.crystal.anomalous(), self.crystal.revision())?;
        self.calculator.update(&self.crystal)?;
        Ok(())
    }

    /// Refresh the crystal and calculator from the structure
    ///
    /// A reflection set generated from a resolution limit is regenerated
    /// when the cell or the symmetry changed.
    fn synchronize(&mut self) -> Result<()> {
        let cell = self.crystal.unit_cell().clone();
        let group = self.crystal.space_group().clone();
        self.crystal.refresh(&self.structure)?;
        self.update_calculator()?;

        if let Some(d_min) = self.reflections.d_min() {
            if &cell != self.crystal.unit_cell() || &group != self.crystal.space_group() {
                self.set_d_min(d_min)?;
                debug!("Regenerated {} reflections for the new cell", self.reflections.len());
            }
        }
        Ok(())
    }

    /// Structure factors of the current reflection set, in order
    pub fn f_calc(&mut self) -> Result<Vec<Complex64>> {
        self.synchronize()?;
        let crystal = &self.crystal;
        let calculator = &self.calculator;
        let f = self
            .reflections
            .indices()
            .par_iter()
            .map(|hkl| accumulate(crystal, calculator, hkl, None))
            .collect::<Result<Vec<_>>>()?;
        debug!("Computed {} structure factors", f.len());
        Ok(f)
    }

    /// Generate reflections to `d_min` and compute their structure factors
    pub fn f_calc_d_min(&mut self, d_min: f64) -> Result<Vec<Complex64>> {
        self.set_d_min(d_min)?;
        self.f_calc()
    }

    /// Structure factors and parameter derivatives of every reflection
    pub fn d_f_calc_d_params(&mut self) -> Result<Vec<FCalcDerivatives>> {
        self.synchronize()?;
        let crystal = &self.crystal;
        let calculator = &self.calculator;
        self.reflections
            .indices()
            .par_iter()
            .map(|hkl| reflection_derivatives(crystal, calculator, hkl))
            .collect()
    }

    /// Structure factor and parameter derivatives of one reflection
    pub fn d_f_calc_hkl_d_params(&mut self, hkl: MillerIndex) -> Result<FCalcDerivatives> {
        self.synchronize()?;
        reflection_derivatives(&self.crystal, &self.calculator, &hkl)
    }

    /// Per-atom `dT/dp = Σ_h Re(conj(D_h) · ∂F_h/∂p)` for the target
    /// gradients `D_h = ∂T/∂Re(F_h) + i ∂T/∂Im(F_h)`
    pub fn d_target_d_params(&mut self, target_gradient: &[Complex64]) -> Result<Vec<TargetDerivatives>> {
        self.selected_d_target_d_params(target_gradient, GradientFlags::all())
    }

    /// As [`d_target_d_params`](Self::d_target_d_params), computing only the
    /// parameter groups selected by `flags`; the others are zero
    pub fn selected_d_target_d_params(
        &mut self,
        target_gradient: &[Complex64],
        flags: GradientFlags,
    ) -> Result<Vec<TargetDerivatives>> {
        self.synchronize()?;
        self.check_gradient_length(target_gradient)?;
        contract(
            &self.crystal,
            &self.calculator,
            &self.reflections,
            target_gradient,
            flags,
        )
    }

    /// As [`d_target_d_params`](Self::d_target_d_params), reporting in
    /// `convention` for this call only
    pub fn d_target_d_params_in(
        &mut self,
        target_gradient: &[Complex64],
        convention: ParameterConvention,
    ) -> Result<Vec<TargetDerivatives>> {
        self.synchronize()?;
        self.check_gradient_length(target_gradient)?;
        let calculator = self.calculator.scoped_convention(convention);
        contract(
            &self.crystal,
            &calculator,
            &self.reflections,
            target_gradient,
            GradientFlags::all(),
        )
    }

    fn check_gradient_length(&self, target_gradient: &[Complex64]) -> Result<()> {
        if target_gradient.len() != self.reflections.len() {
            return Err(EngineError::DimensionMismatch {
                expected: self.reflections.len(),
                actual: target_gradient.len(),
            });
        }
        Ok(())
    }
}
