//! Conversions of CGMES equipment into network elements.
//!
//! Each equipment class has a conversion that first checks the records it
//! was built from ([`EquipmentConversion::valid`]) and then writes into the
//! network. Equipment failing validation is reported and skipped; the run
//! goes on.

pub mod boundary_node;
pub mod control_area;
pub mod equipment;
pub mod equivalent_branch;
pub mod equivalent_injection;
pub mod line;
pub mod regulating_control;
pub mod series_compensator;
pub mod sv_injection;
pub mod switch;
pub mod transformer;

use cimgrid_core::GridResult;

use crate::context::Context;
use equipment::Equipment;

use equivalent_branch::EquivalentBranchConversion;
use equivalent_injection::EquivalentInjectionConversion;
use line::AcLineSegmentConversion;
use series_compensator::SeriesCompensatorConversion;
use switch::SwitchConversion;
use transformer::three_winding::ThreeWindingsTransformerConversion;
use transformer::two_winding::TwoWindingsTransformerConversion;
use transformer::POWER_TRANSFORMER;

pub trait EquipmentConversion {
    fn equipment(&self) -> &Equipment;

    /// Check the records, reporting every problem found. Nothing is written
    /// to the network when this returns `false`.
    fn valid(&self, ctx: &mut Context) -> bool;

    fn convert(&self, ctx: &mut Context) -> GridResult<()>;
}

/// One equipment waiting to be converted.
#[derive(Debug, Clone)]
pub enum Conversion {
    AcLineSegment(AcLineSegmentConversion),
    EquivalentBranch(EquivalentBranchConversion),
    SeriesCompensator(SeriesCompensatorConversion),
    Switch(SwitchConversion),
    TwoWindingsTransformer(TwoWindingsTransformerConversion),
    ThreeWindingsTransformer(ThreeWindingsTransformerConversion),
    EquivalentInjection(EquivalentInjectionConversion),
}

impl Conversion {
    fn inner(&self) -> &dyn EquipmentConversion {
        match self {
            Conversion::AcLineSegment(c) => c,
            Conversion::EquivalentBranch(c) => c,
            Conversion::SeriesCompensator(c) => c,
            Conversion::Switch(c) => c,
            Conversion::TwoWindingsTransformer(c) => c,
            Conversion::ThreeWindingsTransformer(c) => c,
            Conversion::EquivalentInjection(c) => c,
        }
    }

    /// Validate then convert. An identifier already taken by another element
    /// makes the equipment invalid; it is reported and skipped.
    pub fn run(&self, ctx: &mut Context) -> GridResult<()> {
        let conversion = self.inner();
        let eq = conversion.equipment();
        if conversion.valid(ctx) && ctx.claim(eq.class, &eq.id) {
            conversion.convert(ctx)?;
        }
        Ok(())
    }

    /// Every equipment of the model, in conversion order.
    ///
    /// Transformers with other than two or three ends are reported here and
    /// left out.
    pub fn from_model(ctx: &mut Context) -> Vec<Conversion> {
        let model = ctx.model;
        let mut conversions = Vec::new();
        conversions.extend(
            model
                .ac_line_segments()
                .iter()
                .map(|bag| Conversion::AcLineSegment(AcLineSegmentConversion::new(ctx, bag))),
        );
        conversions.extend(model.equivalent_branches().iter().map(|bag| {
            Conversion::EquivalentBranch(EquivalentBranchConversion::new(ctx, bag))
        }));
        conversions.extend(model.series_compensators().iter().map(|bag| {
            Conversion::SeriesCompensator(SeriesCompensatorConversion::new(ctx, bag))
        }));
        conversions.extend(
            model
                .switches()
                .iter()
                .map(|bag| Conversion::Switch(SwitchConversion::new(ctx, bag))),
        );
        for transformer in model.transformers() {
            match transformer.ends.len() {
                2 => conversions.push(Conversion::TwoWindingsTransformer(
                    TwoWindingsTransformerConversion::new(ctx, transformer),
                )),
                3 => conversions.push(Conversion::ThreeWindingsTransformer(
                    ThreeWindingsTransformerConversion::new(ctx, transformer),
                )),
                n => ctx.invalid(
                    POWER_TRANSFORMER,
                    &transformer.id,
                    &format!("{} transformer ends", n),
                ),
            }
        }
        conversions.extend(model.equivalent_injections().iter().map(|bag| {
            Conversion::EquivalentInjection(EquivalentInjectionConversion::new(ctx, bag))
        }));
        conversions
    }
}
