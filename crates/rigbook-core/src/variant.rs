//! # Variants & Colors
//!
//! Purchasable variants per component, each carrying zero or more colors
//! through the color-variant bridge. Colors are a small reference table
//! keyed by their code.
//!
//! | Relation | On parent delete |
//! |---|---|
//! | Variant -> ColorVariant | cascade |
//! | Color -> ColorVariant | restrict |

use crate::catalog::Catalog;
use crate::primitives::{MAX_COLOR_CODE_LENGTH, MAX_COLOR_NAME_LENGTH};
use crate::record;
use crate::store::{self, CatalogStore, ReadTx, Table, WriteTx};
use crate::{
    CatalogError, ColorCode, ColorVariantId, ComponentId, Constraint, Decimal, FieldViolation,
    Ref, VariantId,
};
use serde::{Deserialize, Serialize};

/// A color reference row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub code: ColorCode,
    pub name: String,
}

/// A purchasable configuration of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub component: ComponentId,
    pub available: bool,
    pub price_delta: Option<Decimal>,
}

/// Bridge row between a variant and one of its colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorVariant {
    pub id: ColorVariantId,
    pub variant: VariantId,
    pub color: ColorCode,
}

/// A variant together with its colors, in bridge-id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantView {
    #[serde(flatten)]
    pub variant: Variant,
    pub colors: Vec<ColorCode>,
}

fn color_key(code: &ColorCode) -> &[u8] {
    code.as_str().as_bytes()
}

fn all_bridges<R: ReadTx + ?Sized>(tx: &R) -> Result<Vec<ColorVariant>, CatalogError> {
    store::load_all(tx, Table::ColorVariants)
}

fn load_variant<R: ReadTx + ?Sized>(tx: &R, id: VariantId) -> Result<Variant, CatalogError> {
    store::load(tx, Table::Variants, &store::id_key(id.0))?
        .ok_or(CatalogError::NotFound(Ref::Variant(id)))
}

fn check_length(field: &str, value: &str, max: usize, violations: &mut Vec<FieldViolation>) {
    let len = value.chars().count();
    if len == 0 || len > max {
        violations.push(FieldViolation::new(field, Constraint::Length { min: 1, max }));
    }
}

/// Remove the bridges of `variant`; returns how many were removed.
fn delete_bridges_of(tx: &mut dyn WriteTx, variant: VariantId) -> Result<usize, CatalogError> {
    let owned: Vec<ColorVariantId> = all_bridges(tx)?
        .into_iter()
        .filter(|bridge| bridge.variant == variant)
        .map(|bridge| bridge.id)
        .collect();
    for id in &owned {
        tx.delete(Table::ColorVariants, &store::id_key(id.0))?;
    }
    Ok(owned.len())
}

/// Remove every variant of `component` with its bridges.
pub(crate) fn delete_variants_of(
    tx: &mut dyn WriteTx,
    component: ComponentId,
) -> Result<usize, CatalogError> {
    let owned: Vec<VariantId> = store::load_all::<Variant, _>(tx, Table::Variants)?
        .into_iter()
        .filter(|variant| variant.component == component)
        .map(|variant| variant.id)
        .collect();
    let mut removed = owned.len();
    for id in owned {
        removed += delete_bridges_of(tx, id)?;
        tx.delete(Table::Variants, &store::id_key(id.0))?;
    }
    Ok(removed)
}

impl<S: CatalogStore> Catalog<S> {
    // =========================================================================
    // COLORS
    // =========================================================================

    /// Insert a color, or rename it if the code already exists.
    pub fn add_color(&self, code: &ColorCode, name: &str) -> Result<(), CatalogError> {
        let mut violations = Vec::new();
        check_length("code", code.as_str(), MAX_COLOR_CODE_LENGTH, &mut violations);
        check_length("name", name, MAX_COLOR_NAME_LENGTH, &mut violations);
        if !violations.is_empty() {
            return Err(CatalogError::Validation(violations));
        }

        let color = Color {
            code: code.clone(),
            name: name.to_string(),
        };
        self.store
            .write(|tx| store::save(tx, Table::Colors, color_key(code), &color))?;
        tracing::debug!(%code, color_name = name, "stored color");
        Ok(())
    }

    /// Every color, ordered by code.
    pub fn list_colors(&self) -> Result<Vec<Color>, CatalogError> {
        self.store.read(|tx| store::load_all(tx, Table::Colors))
    }

    /// Delete a color no color variant references.
    pub fn remove_color(&self, code: &ColorCode) -> Result<(), CatalogError> {
        let result = self.store.write(|tx| {
            if tx.get(Table::Colors, color_key(code))?.is_none() {
                return Err(CatalogError::NotFound(Ref::Color(code.clone())));
            }
            let blocking: Vec<Ref> = all_bridges(tx)?
                .into_iter()
                .filter(|bridge| &bridge.color == code)
                .map(|bridge| Ref::ColorVariant(bridge.id))
                .collect();
            if !blocking.is_empty() {
                return Err(CatalogError::ReferentialIntegrity {
                    blocking_refs: blocking,
                });
            }
            tx.delete(Table::Colors, color_key(code))?;
            Ok(())
        });

        match &result {
            Ok(()) => tracing::info!(%code, "removed color"),
            Err(CatalogError::ReferentialIntegrity { blocking_refs }) => {
                tracing::warn!(%code, blocking = blocking_refs.len(), "color removal restricted");
            }
            Err(_) => {}
        }
        result
    }

    // =========================================================================
    // VARIANTS
    // =========================================================================

    pub fn add_variant(
        &self,
        component: ComponentId,
        available: bool,
        price_delta: Option<Decimal>,
    ) -> Result<VariantId, CatalogError> {
        let id = self.store.write(|tx| {
            record::require_component(tx, component)?;
            let id = VariantId(tx.next_id(Table::Variants)?);
            store::save(
                tx,
                Table::Variants,
                &store::id_key(id.0),
                &Variant {
                    id,
                    component,
                    available,
                    price_delta,
                },
            )?;
            Ok(id)
        })?;
        tracing::debug!(%id, %component, available, "added variant");
        Ok(id)
    }

    /// Delete a variant and its color associations.
    pub fn remove_variant(&self, id: VariantId) -> Result<(), CatalogError> {
        let bridges = self.store.write(|tx| {
            load_variant(tx, id)?;
            let bridges = delete_bridges_of(tx, id)?;
            tx.delete(Table::Variants, &store::id_key(id.0))?;
            Ok(bridges)
        })?;
        tracing::info!(%id, cascaded = bridges, "removed variant");
        Ok(())
    }

    /// Variants of `component` with their colors, in variant-id order.
    pub fn list_variants(&self, component: ComponentId) -> Result<Vec<VariantView>, CatalogError> {
        self.store.read(|tx| {
            record::require_component(tx, component)?;
            let bridges = all_bridges(tx)?;
            Ok(store::load_all::<Variant, _>(tx, Table::Variants)?
                .into_iter()
                .filter(|variant| variant.component == component)
                .map(|variant| VariantView {
                    colors: bridges
                        .iter()
                        .filter(|bridge| bridge.variant == variant.id)
                        .map(|bridge| bridge.color.clone())
                        .collect(),
                    variant,
                })
                .collect())
        })
    }

    /// Associate a known color with a variant.
    ///
    /// An unknown color fails with `ReferentialIntegrity`; an existing
    /// association is returned as is.
    pub fn add_color_variant(
        &self,
        variant: VariantId,
        color: &ColorCode,
    ) -> Result<ColorVariantId, CatalogError> {
        let id = self.store.write(|tx| {
            load_variant(tx, variant)?;
            if tx.get(Table::Colors, color_key(color))?.is_none() {
                return Err(CatalogError::ReferentialIntegrity {
                    blocking_refs: vec![Ref::Color(color.clone())],
                });
            }

            if let Some(existing) = all_bridges(tx)?
                .into_iter()
                .find(|bridge| bridge.variant == variant && &bridge.color == color)
            {
                return Ok(existing.id);
            }

            let id = ColorVariantId(tx.next_id(Table::ColorVariants)?);
            store::save(
                tx,
                Table::ColorVariants,
                &store::id_key(id.0),
                &ColorVariant {
                    id,
                    variant,
                    color: color.clone(),
                },
            )?;
            Ok(id)
        })?;
        tracing::debug!(%id, %variant, %color, "added color variant");
        Ok(id)
    }

    pub fn remove_color_variant(&self, id: ColorVariantId) -> Result<(), CatalogError> {
        self.store.write(|tx| {
            if !tx.delete(Table::ColorVariants, &store::id_key(id.0))? {
                return Err(CatalogError::NotFound(Ref::ColorVariant(id)));
            }
            Ok(())
        })?;
        tracing::info!(%id, "removed color variant");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::schema::{ComponentKind, Kind};
    use crate::store::MemoryStore;
    use crate::{CatalogConfig, RawAttributes, RecordId};

    fn setup() -> (Catalog<MemoryStore>, ComponentId) {
        let catalog = Catalog::new(MemoryStore::new(), CatalogConfig::default()).expect("catalog");
        let raw: RawAttributes = [
            ("Name", "NH-D15".into()),
            ("Manufacturer", "Noctua".into()),
            ("CoolerType", "Air".into()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let id = match catalog
            .create(Kind::Component(ComponentKind::Cooler), &raw)
            .expect("cooler")
        {
            RecordId::Component(id) => id,
            RecordId::SubComponent(_) => unreachable!("cooler is a component"),
        };
        (catalog, id)
    }

    fn code(s: &str) -> ColorCode {
        ColorCode::new(s)
    }

    #[test]
    fn unreferenced_color_can_be_removed() {
        let (catalog, _) = setup();
        catalog.add_color(&code("BLK"), "Black").expect("add");
        catalog.remove_color(&code("BLK")).expect("remove");
        assert!(catalog.list_colors().expect("list").is_empty());
        assert!(matches!(
            catalog.remove_color(&code("BLK")),
            Err(CatalogError::NotFound(Ref::Color(_)))
        ));
    }

    #[test]
    fn referenced_color_is_restricted() {
        let (catalog, cooler) = setup();
        catalog.add_color(&code("BRN"), "Brown").expect("add");
        let variant = catalog.add_variant(cooler, true, None).expect("variant");
        let bridge = catalog
            .add_color_variant(variant, &code("BRN"))
            .expect("bridge");

        let err = catalog.remove_color(&code("BRN")).expect_err("restricted");
        match err {
            CatalogError::ReferentialIntegrity { blocking_refs } => {
                assert_eq!(blocking_refs, vec![Ref::ColorVariant(bridge)]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(catalog.list_colors().expect("list").len(), 1);
    }

    #[test]
    fn unknown_color_fails_integrity() {
        let (catalog, cooler) = setup();
        let variant = catalog.add_variant(cooler, true, None).expect("variant");
        let err = catalog
            .add_color_variant(variant, &code("PNK"))
            .expect_err("unknown");
        assert!(matches!(err, CatalogError::ReferentialIntegrity { .. }));
    }

    #[test]
    fn multi_color_variants_and_idempotent_bridge() {
        let (catalog, cooler) = setup();
        catalog.add_color(&code("BLK"), "Black").expect("add");
        catalog.add_color(&code("WHT"), "White").expect("add");
        let plain = catalog.add_variant(cooler, false, None).expect("plain");
        let duo = catalog
            .add_variant(cooler, true, Some(Decimal::from_int(10)))
            .expect("duo");

        let first = catalog.add_color_variant(duo, &code("BLK")).expect("blk");
        catalog.add_color_variant(duo, &code("WHT")).expect("wht");
        assert_eq!(
            catalog.add_color_variant(duo, &code("BLK")).expect("again"),
            first
        );

        let views = catalog.list_variants(cooler).expect("list");
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].variant.id, plain);
        assert!(views[0].colors.is_empty());
        assert_eq!(views[1].colors, vec![code("BLK"), code("WHT")]);
    }

    #[test]
    fn removing_variant_releases_colors() {
        let (catalog, cooler) = setup();
        catalog.add_color(&code("BLK"), "Black").expect("add");
        let variant = catalog.add_variant(cooler, true, None).expect("variant");
        catalog
            .add_color_variant(variant, &code("BLK"))
            .expect("bridge");

        catalog.remove_variant(variant).expect("remove");
        catalog.remove_color(&code("BLK")).expect("now free");
    }

    #[test]
    fn color_fields_are_bounded() {
        let (catalog, _) = setup();
        let err = catalog
            .add_color(&code(""), &"x".repeat(MAX_COLOR_NAME_LENGTH + 1))
            .expect_err("invalid");
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn component_delete_cascades_variants() {
        let (catalog, cooler) = setup();
        catalog.add_color(&code("BLK"), "Black").expect("add");
        let variant = catalog.add_variant(cooler, true, None).expect("variant");
        catalog
            .add_color_variant(variant, &code("BLK"))
            .expect("bridge");

        catalog.delete(RecordId::Component(cooler)).expect("delete");
        let stats = catalog.stats().expect("stats");
        assert_eq!(stats.tables["variants"], 0);
        assert_eq!(stats.tables["color_variants"], 0);
        assert_eq!(stats.tables["colors"], 1);
    }
}
