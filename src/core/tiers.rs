use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Price class used when no comparable listings exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrandTier {
    Luxury,
    MainstreamPremium,
    Economy,
    Baseline,
}

const LUXURY_BRANDS: &[&str] = &[
    "audi", "bmw", "mercedes-benz", "mercedes", "lexus", "porsche", "volvo",
    "land rover", "jaguar", "tesla", "infiniti", "acura", "cadillac", "lincoln",
    "genesis", "mini",
];

const MAINSTREAM_PREMIUM_BRANDS: &[&str] = &[
    "toyota", "honda", "mazda", "volkswagen", "subaru", "ford", "jeep", "gmc", "ram", "buick",
];

const ECONOMY_BRANDS: &[&str] = &[
    "nissan", "chevrolet", "kia", "hyundai", "suzuki", "renault", "fiat", "seat",
    "mitsubishi", "peugeot", "dodge", "chirey", "mg", "jac",
];

/// Brand-to-tier lookup with a new-vehicle reference price per tier
#[derive(Debug, Clone)]
pub struct BrandTierTable {
    brands: HashMap<String, BrandTier>,
    luxury_price: i64,
    mainstream_premium_price: i64,
    economy_price: i64,
    baseline_price: i64,
}

impl BrandTierTable {
    pub fn new(luxury_price: i64, mainstream_premium_price: i64, economy_price: i64, baseline_price: i64) -> Self {
        Self {
            brands: HashMap::new(),
            luxury_price,
            mainstream_premium_price,
            economy_price,
            baseline_price,
        }
    }

    /// Assign brands to a tier, replacing any previous assignment
    pub fn with_brands<I, S>(mut self, tier: BrandTier, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for brand in brands {
            self.brands.insert(normalize_brand(brand.as_ref()), tier);
        }
        self
    }

    /// Unclassified brands fall into the baseline tier
    pub fn classify(&self, brand: &str) -> BrandTier {
        self.brands
            .get(&normalize_brand(brand))
            .copied()
            .unwrap_or(BrandTier::Baseline)
    }

    pub fn base_price(&self, tier: BrandTier) -> i64 {
        match tier {
            BrandTier::Luxury => self.luxury_price,
            BrandTier::MainstreamPremium => self.mainstream_premium_price,
            BrandTier::Economy => self.economy_price,
            BrandTier::Baseline => self.baseline_price,
        }
    }

    /// Brands assigned to a tier, sorted
    pub fn brands_in(&self, tier: BrandTier) -> Vec<String> {
        let mut brands: Vec<String> = self
            .brands
            .iter()
            .filter(|(_, t)| **t == tier)
            .map(|(b, _)| b.clone())
            .collect();
        brands.sort();
        brands
    }

    pub fn base_price_for(&self, brand: &str) -> i64 {
        self.base_price(self.classify(brand))
    }
}

impl Default for BrandTierTable {
    fn default() -> Self {
        Self::new(800_000, 450_000, 300_000, 350_000)
            .with_brands(BrandTier::Luxury, LUXURY_BRANDS)
            .with_brands(BrandTier::MainstreamPremium, MAINSTREAM_PREMIUM_BRANDS)
            .with_brands(BrandTier::Economy, ECONOMY_BRANDS)
    }
}

pub(crate) fn normalize_brand(brand: &str) -> String {
    brand.trim().to_lowercase()
}
