//! Shopping list export.
//!
//! Every recipe in a user's shopping cart contributes its ingredient rows. Rows
//! are grouped by ingredient name and measurement unit and their amounts are
//! summed, so an ingredient used by several recipes appears once. The result is
//! ordered by name ignoring case and rendered one ingredient per line.

use std::collections::BTreeMap;

use serde::Serialize;

/// One ingredient row of one recipe in the cart.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IngredientTotal {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

pub fn aggregate<I>(lines: I) -> Vec<IngredientTotal>
where
    I: IntoIterator<Item = CartLine>,
{
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for line in lines {
        *totals
            .entry((line.name, line.measurement_unit))
            .or_insert(0) += i64::from(line.amount);
    }

    let mut totals: Vec<IngredientTotal> = totals
        .into_iter()
        .map(|((name, measurement_unit), total)| IngredientTotal {
            name,
            measurement_unit,
            total,
        })
        .collect();
    // Stable sort: equal lowercase names keep the (name, unit) order of the map.
    totals.sort_by_cached_key(|t| t.name.to_lowercase());
    totals
}

pub fn render(totals: &[IngredientTotal]) -> String {
    totals
        .iter()
        .map(|t| format!("{} ({}) — {}\n", t.name, t.measurement_unit, t.total))
        .collect()
}
