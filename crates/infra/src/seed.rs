//! Synthetic sales data for demos and tests.
//!
//! Generation is deterministic for a given `seed`. Every sale is a whole
//! quantity of one catalog product at its selling price.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use branchcast_core::{Branch, BranchId, SaleFact};

use crate::store::{SalesSink, StoreError};

const CITIES: [&str; 6] = ["Istanbul", "Ankara", "Izmir", "Bursa", "Antalya", "Konya"];
const CATEGORIES: [&str; 5] = ["Dairy", "Legumes", "Snacks", "Beverages", "Cleaning"];
const CATALOG_SIZE: u32 = 10;

/// Facts are written in chunks of this size.
const INSERT_CHUNK: usize = 1_000;

/// Plan for a synthetic sales history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSales {
    /// Established branches, ids `1..=branches`.
    pub branches: u32,
    /// Days of history for established branches, ending on `end_date`.
    pub days: u32,
    pub sales_per_day: u32,
    pub end_date: NaiveDate,
    pub seed: u64,
    /// Adds one more branch that opened this many days before `end_date`.
    pub young_branch_days: Option<u32>,
}

/// A product sales are priced from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub product_id: u32,
    pub name: String,
    pub category: &'static str,
    pub unit_cost: f64,
    pub selling_price: f64,
}

/// Generated rows, ready to insert.
///
/// The catalog is not written to the store; only branches and sales are.
#[derive(Debug, Clone, Default)]
pub struct SyntheticData {
    pub branches: Vec<Branch>,
    pub products: Vec<Product>,
    pub sales: Vec<SaleFact>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub branches: usize,
    pub sales: usize,
}

impl SyntheticSales {
    /// One branch, 14 days, 20 sales a day.
    pub fn new(end_date: NaiveDate) -> Self {
        Self {
            branches: 1,
            days: 14,
            sales_per_day: 20,
            end_date,
            seed: 42,
            young_branch_days: None,
        }
    }

    pub fn with_branches(mut self, branches: u32) -> Self {
        self.branches = branches;
        self
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn with_sales_per_day(mut self, sales_per_day: u32) -> Self {
        self.sales_per_day = sales_per_day;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_young_branch(mut self, days: u32) -> Self {
        self.young_branch_days = Some(days);
        self
    }

    pub fn generate(&self) -> SyntheticData {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut data = SyntheticData {
            products: catalog(&mut rng),
            ..SyntheticData::default()
        };

        let mut plan: Vec<(i32, u32)> = (1..=self.branches).map(|b| (b as i32, self.days)).collect();
        if let Some(days) = self.young_branch_days {
            plan.push((self.branches as i32 + 1, days));
        }

        for (raw_id, days) in plan {
            let branch_id = BranchId::from_raw(raw_id);
            let opening_date = self.end_date - Duration::days(i64::from(days.saturating_sub(1)));
            data.branches.push(Branch {
                branch_id,
                name: format!("Branch {raw_id}"),
                city: CITIES[(raw_id as usize - 1) % CITIES.len()].to_string(),
                opening_date,
            });

            // Larger branches sell more; fixed per branch so series differ in level.
            let scale = rng.gen_range(0.7..1.4);
            for offset in 0..days {
                let date = opening_date + Duration::days(i64::from(offset));
                let factor = scale * weekday_factor(date) * (1.0 + 0.0008 * f64::from(offset));
                self.push_day(&mut rng, &data.products, branch_id, date, factor, &mut data.sales);
            }
        }

        data
    }

    fn push_day(
        &self,
        rng: &mut StdRng,
        products: &[Product],
        branch_id: BranchId,
        date: NaiveDate,
        factor: f64,
        out: &mut Vec<SaleFact>,
    ) {
        for _ in 0..self.sales_per_day {
            let hour = rng.gen_range(9..=21);
            let minute = rng.gen_range(0..60);
            let Some(sold_at) = date.and_hms_opt(hour, minute, 0) else {
                continue;
            };
            let product = &products[rng.gen_range(0..products.len())];
            // Busier days sell larger baskets.
            let noise: f64 = rng.gen_range(0.85..1.15);
            let basket = f64::from(rng.gen_range(1u32..=4)) * factor * noise;
            let quantity = basket.round().max(1.0);
            let amount = round_cents(quantity * product.selling_price);
            out.push(SaleFact::new(sold_at, branch_id, amount));
        }
    }

    /// Generate and write through `sink`.
    pub async fn seed_into<S>(&self, sink: &S) -> Result<SeedReport, StoreError>
    where
        S: SalesSink + ?Sized,
    {
        let data = self.generate();
        let branches = sink.insert_branches(&data.branches).await?;

        let mut sales = 0;
        for chunk in data.sales.chunks(INSERT_CHUNK) {
            sales += sink.insert_sales(chunk).await?;
        }

        info!(branches, sales, end_date = %self.end_date, seed = self.seed, "synthetic sales seeded");
        Ok(SeedReport { branches, sales })
    }
}

/// Products with a cost of 5 to 50 and a 30% to 80% markup.
fn catalog(rng: &mut StdRng) -> Vec<Product> {
    (1..=CATALOG_SIZE)
        .map(|product_id| {
            let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
            let unit_cost = round_cents(rng.gen_range(5.0..50.0));
            let selling_price = round_cents(unit_cost * rng.gen_range(1.3..1.8));
            Product {
                product_id,
                name: format!("{category} product {product_id}"),
                category,
                unit_cost,
                selling_price,
            }
        })
        .collect()
}

fn weekday_factor(date: NaiveDate) -> f64 {
    match date.weekday() {
        Weekday::Mon | Weekday::Tue => 0.9,
        Weekday::Wed | Weekday::Thu => 1.0,
        Weekday::Fri => 1.15,
        Weekday::Sat => 1.35,
        Weekday::Sun => 1.2,
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, SalesSource};
    use branchcast_core::{DailySeries, EntitySelector};

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    #[test]
    fn same_seed_same_data() {
        let plan = SyntheticSales::new(end()).with_branches(2).with_days(20);
        let a = plan.generate();
        let b = plan.generate();
        assert_eq!(a.sales, b.sales);
        assert_eq!(a.branches, b.branches);
        assert_eq!(a.products, b.products);

        let c = plan.clone().with_seed(7).generate();
        assert_ne!(a.sales, c.sales);
    }

    #[test]
    fn every_day_has_sales_ending_on_end_date() {
        let data = SyntheticSales::new(end()).with_days(30).with_sales_per_day(5).generate();
        let series = DailySeries::from_facts(EntitySelector::Branch(BranchId::from_raw(1)), &data.sales)
            .unwrap();

        assert_eq!(series.len(), 30);
        assert_eq!(series.last_date(), Some(end()));
        assert_eq!(data.branches[0].opening_date, series.first_date().unwrap());
        assert!(data.sales.iter().all(|s| s.amount > 0.0));
    }

    #[test]
    fn amounts_are_whole_cents() {
        let data = SyntheticSales::new(end()).generate();
        for sale in &data.sales {
            let cents = sale.amount * 100.0;
            assert!((cents - cents.round()).abs() < 1e-6, "{}", sale.amount);
        }
    }

    #[test]
    fn sales_are_whole_quantities_of_catalog_prices() {
        let data = SyntheticSales::new(end()).with_days(30).generate();
        assert_eq!(data.products.len(), 10);
        for product in &data.products {
            assert!((5.0..=50.0).contains(&product.unit_cost), "{product:?}");
            assert!(product.selling_price >= product.unit_cost * 1.29, "{product:?}");
            assert!(product.selling_price <= product.unit_cost * 1.81, "{product:?}");
        }

        for sale in &data.sales {
            let priced = data.products.iter().any(|p| {
                let quantity = sale.amount / p.selling_price;
                quantity >= 0.999 && (quantity - quantity.round()).abs() < 1e-6
            });
            assert!(priced, "{} is no multiple of a catalog price", sale.amount);
        }
    }

    #[test]
    fn young_branch_has_short_history() {
        let data = SyntheticSales::new(end())
            .with_branches(2)
            .with_days(60)
            .with_young_branch(10)
            .generate();

        assert_eq!(data.branches.len(), 3);
        let young = BranchId::from_raw(3);
        let series = DailySeries::from_facts(EntitySelector::Branch(young), &data.sales).unwrap();
        assert_eq!(series.len(), 10);
    }

    #[tokio::test]
    async fn seeding_writes_everything_through_the_sink() {
        let store = InMemoryStore::new();
        let plan = SyntheticSales::new(end())
            .with_days(100)
            .with_sales_per_day(15);

        let report = plan.seed_into(&store).await.unwrap();
        assert_eq!(report, SeedReport { branches: 1, sales: 1_500 });

        let facts = store.sale_facts(EntitySelector::AllBranches).await.unwrap();
        assert_eq!(facts.len(), 1_500);
        assert_eq!(store.branch_ids().await.unwrap(), vec![BranchId::from_raw(1)]);
    }
}
