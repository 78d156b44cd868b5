//! # Prices & Reviews
//!
//! Retailer price observations and user reviews attached to a component.
//! Both cascade when their component is deleted.

use crate::catalog::Catalog;
use crate::primitives::{MAX_PRICE, MAX_RATING, MAX_RETAILER_LENGTH, MAX_REVIEW_LENGTH, MIN_RATING};
use crate::record;
use crate::store::{self, CatalogStore, Table, WriteTx};
use crate::{CatalogError, ComponentId, Constraint, Decimal, FieldViolation, PriceId, ReviewId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: PriceId,
    pub component: ComponentId,
    pub retailer: String,
    pub amount: Decimal,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub component: ComponentId,
    pub rating: u8,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

fn delete_where<T, F>(tx: &mut dyn WriteTx, table: Table, owned: F) -> Result<usize, CatalogError>
where
    T: serde::de::DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let mut removed = 0;
    for (key, bytes) in tx.scan(table)? {
        if owned(&store::decode(&bytes)?) {
            tx.delete(table, &key)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Remove every price and review of `component`.
pub(crate) fn delete_listings_of(
    tx: &mut dyn WriteTx,
    component: ComponentId,
) -> Result<usize, CatalogError> {
    let prices = delete_where(tx, Table::Prices, |p: &Price| p.component == component)?;
    let reviews = delete_where(tx, Table::Reviews, |r: &Review| r.component == component)?;
    Ok(prices + reviews)
}

impl<S: CatalogStore> Catalog<S> {
    /// Record a retailer price for `component`, stamped with the clock.
    pub fn add_price(
        &self,
        component: ComponentId,
        retailer: &str,
        amount: Decimal,
    ) -> Result<PriceId, CatalogError> {
        let mut violations = Vec::new();
        let retailer_len = retailer.chars().count();
        if retailer_len == 0 || retailer_len > MAX_RETAILER_LENGTH {
            violations.push(FieldViolation::new(
                "retailer",
                Constraint::Length {
                    min: 1,
                    max: MAX_RETAILER_LENGTH,
                },
            ));
        }
        if amount < Decimal::ZERO || amount > MAX_PRICE {
            violations.push(FieldViolation::new(
                "amount",
                Constraint::DecimalRange {
                    min: Decimal::ZERO,
                    max: MAX_PRICE,
                },
            ));
        }
        if !violations.is_empty() {
            return Err(CatalogError::Validation(violations));
        }

        let recorded_at = self.clock.now();
        let id = self.store.write(|tx| {
            record::require_component(tx, component)?;
            let id = PriceId(tx.next_id(Table::Prices)?);
            store::save(
                tx,
                Table::Prices,
                &store::id_key(id.0),
                &Price {
                    id,
                    component,
                    retailer: retailer.to_string(),
                    amount,
                    recorded_at,
                },
            )?;
            Ok(id)
        })?;
        tracing::debug!(%id, %component, %amount, "added price");
        Ok(id)
    }

    pub fn list_prices(&self, component: ComponentId) -> Result<Vec<Price>, CatalogError> {
        self.store.read(|tx| {
            record::require_component(tx, component)?;
            Ok(store::load_all::<Price, _>(tx, Table::Prices)?
                .into_iter()
                .filter(|price| price.component == component)
                .collect())
        })
    }

    /// Add a review with a whole-star rating.
    pub fn add_review(
        &self,
        component: ComponentId,
        rating: u8,
        body: &str,
    ) -> Result<ReviewId, CatalogError> {
        let mut violations = Vec::new();
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            violations.push(FieldViolation::new(
                "rating",
                Constraint::IntRange {
                    min: i64::from(MIN_RATING),
                    max: i64::from(MAX_RATING),
                },
            ));
        }
        if body.chars().count() > MAX_REVIEW_LENGTH {
            violations.push(FieldViolation::new(
                "body",
                Constraint::Length {
                    min: 0,
                    max: MAX_REVIEW_LENGTH,
                },
            ));
        }
        if !violations.is_empty() {
            return Err(CatalogError::Validation(violations));
        }

        let created_at = self.clock.now();
        let id = self.store.write(|tx| {
            record::require_component(tx, component)?;
            let id = ReviewId(tx.next_id(Table::Reviews)?);
            store::save(
                tx,
                Table::Reviews,
                &store::id_key(id.0),
                &Review {
                    id,
                    component,
                    rating,
                    body: body.to_string(),
                    created_at,
                },
            )?;
            Ok(id)
        })?;
        tracing::debug!(%id, %component, rating, "added review");
        Ok(id)
    }

    pub fn list_reviews(&self, component: ComponentId) -> Result<Vec<Review>, CatalogError> {
        self.store.read(|tx| {
            record::require_component(tx, component)?;
            Ok(store::load_all::<Review, _>(tx, Table::Reviews)?
                .into_iter()
                .filter(|review| review.component == component)
                .collect())
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::schema::{ComponentKind, Kind};
    use crate::store::MemoryStore;
    use crate::{CatalogConfig, RawAttributes, RecordId};

    fn setup() -> (Catalog<MemoryStore>, ComponentId) {
        let catalog = Catalog::new(MemoryStore::new(), CatalogConfig::default())
            .expect("catalog")
            .with_clock(FixedClock::at_unix(1_720_000_000));
        let raw: RawAttributes = [
            ("Name", "990 Pro".into()),
            ("Manufacturer", "Samsung".into()),
            ("Capacity", 2000.into()),
            ("StorageType", "SSD".into()),
            ("FormFactor", "M.2-2280".into()),
            ("Interface", "NVMe PCIe 4.0".into()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        match catalog
            .create(Kind::Component(ComponentKind::Storage), &raw)
            .expect("storage")
        {
            RecordId::Component(id) => (catalog, id),
            RecordId::SubComponent(_) => unreachable!("storage is a component"),
        }
    }

    #[test]
    fn prices_are_stamped_and_listed() {
        let (catalog, ssd) = setup();
        let amount: Decimal = "169.99".parse().expect("amount");
        catalog.add_price(ssd, "Newegg", amount).expect("price");

        let prices = catalog.list_prices(ssd).expect("list");
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].amount, amount);
        assert_eq!(prices[0].recorded_at.timestamp(), 1_720_000_000);
    }

    #[test]
    fn invalid_review_reports_all_fields() {
        let (catalog, ssd) = setup();
        let err = catalog
            .add_review(ssd, 6, &"!".repeat(MAX_REVIEW_LENGTH + 1))
            .expect_err("invalid");
        let fields: Vec<_> = err.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["rating", "body"]);
    }

    #[test]
    fn negative_price_rejected() {
        let (catalog, ssd) = setup();
        assert!(catalog
            .add_price(ssd, "Shop", Decimal::from_int(-1))
            .is_err());
    }

    #[test]
    fn listings_cascade_with_component() {
        let (catalog, ssd) = setup();
        catalog
            .add_price(ssd, "Shop", Decimal::from_int(99))
            .expect("price");
        catalog.add_review(ssd, 5, "fast").expect("review");
        catalog.delete(RecordId::Component(ssd)).expect("delete");

        let stats = catalog.stats().expect("stats");
        assert_eq!(stats.tables["prices"], 0);
        assert_eq!(stats.tables["reviews"], 0);
        assert!(matches!(
            catalog.list_reviews(ssd),
            Err(CatalogError::NotFound(_))
        ));
    }
}
