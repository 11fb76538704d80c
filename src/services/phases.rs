use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::services::pipeline::{EntityPipeline, Pipeline};
use crate::services::sequence::SequenceKind;
use crate::transform::{
    CategoryTransformer, CustomerTransformer, ManufacturerTransformer, OrderStatusTransformer,
    OrderTransformer, ProductTransformer,
};

/// Migration phases in dependency order. Later phases reference ids created
/// by earlier ones, so they only ever run one after the other.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize,
)]
pub enum PhaseName {
    #[strum(serialize = "phase1")]
    #[serde(rename = "phase1")]
    Lookups,
    #[strum(serialize = "phase4")]
    #[serde(rename = "phase4")]
    Users,
    #[strum(serialize = "phase5")]
    #[serde(rename = "phase5")]
    Catalog,
    #[strum(serialize = "phase6")]
    #[serde(rename = "phase6")]
    Products,
    #[strum(serialize = "phase7")]
    #[serde(rename = "phase7")]
    Orders,
}

impl PhaseName {
    pub fn all() -> Vec<PhaseName> {
        PhaseName::iter().collect()
    }

    /// Status record names of every phase, for progress reporting.
    pub fn known() -> Vec<String> {
        PhaseName::iter().map(|p| p.to_string()).collect()
    }

    pub fn title(&self) -> &'static str {
        match self {
            PhaseName::Lookups => "Manufacturers and order statuses",
            PhaseName::Users => "Customers",
            PhaseName::Catalog => "Categories",
            PhaseName::Products => "Products",
            PhaseName::Orders => "Orders",
        }
    }

    /// Id spaces bootstrapped before the load and synced after it.
    pub fn sequences(&self) -> &'static [SequenceKind] {
        match self {
            PhaseName::Lookups => &[SequenceKind::Manufacturer, SequenceKind::OrderStatus],
            PhaseName::Users => &[SequenceKind::Customer],
            PhaseName::Catalog => &[SequenceKind::Category],
            PhaseName::Products => &[SequenceKind::Product],
            PhaseName::Orders => &[
                SequenceKind::Order,
                SequenceKind::OrderProduct,
                SequenceKind::OrderOption,
            ],
        }
    }

    /// Target collections the phase fills; any document in one of them
    /// marks the phase as already migrated.
    pub fn collections(&self) -> &'static [&'static str] {
        match self {
            PhaseName::Lookups => &["manufacturers", "order_statuses"],
            PhaseName::Users => &["customers"],
            PhaseName::Catalog => &["categories"],
            PhaseName::Products => &["products"],
            PhaseName::Orders => &["orders"],
        }
    }

    /// Fresh entity pipelines in load order.
    pub fn pipelines(&self) -> Vec<Box<dyn EntityPipeline>> {
        match self {
            PhaseName::Lookups => vec![
                Pipeline::boxed(ManufacturerTransformer),
                Pipeline::boxed(OrderStatusTransformer),
            ],
            PhaseName::Users => vec![Pipeline::boxed(CustomerTransformer)],
            PhaseName::Catalog => vec![Pipeline::boxed(CategoryTransformer::default())],
            PhaseName::Products => vec![Pipeline::boxed(ProductTransformer)],
            PhaseName::Orders => vec![Pipeline::boxed(OrderTransformer)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn cli_names_round_trip() {
        let names: Vec<String> = PhaseName::known();
        assert_eq!(names, vec!["phase1", "phase4", "phase5", "phase6", "phase7"]);
        assert_eq!(PhaseName::from_str("phase6").unwrap(), PhaseName::Products);
        assert!(PhaseName::from_str("phase2").is_err());
    }

    #[test]
    fn pipelines_fill_the_declared_collections() {
        for phase in PhaseName::all() {
            let collections: Vec<&str> = phase.pipelines().iter().map(|p| p.collection()).collect();
            assert_eq!(collections, phase.collections(), "{phase}");
        }
    }

    #[test]
    fn every_sequence_points_at_a_phase_collection() {
        for phase in PhaseName::all() {
            for kind in phase.sequences() {
                assert!(phase.collections().contains(&kind.collection()), "{kind}");
            }
        }
    }

    #[test]
    fn pipelines_name_their_entity_tables() {
        use crate::entities::{category, customer, manufacturer, order, order_status, product};
        use sea_orm::EntityName;

        let entities: Vec<&str> = PhaseName::all()
            .into_iter()
            .flat_map(|phase| phase.pipelines())
            .map(|p| p.entity())
            .collect();
        assert_eq!(
            entities,
            vec![
                manufacturer::Entity.table_name(),
                order_status::Entity.table_name(),
                customer::Entity.table_name(),
                category::Entity.table_name(),
                product::Entity.table_name(),
                order::Entity.table_name(),
            ]
        );
    }

    #[test]
    fn orders_read_their_line_tables() {
        let tables = PhaseName::Orders.pipelines()[0].source_tables();
        assert_eq!(tables, vec!["order", "order_product", "order_option"]);
    }
}
