use std::collections::BTreeMap;

use crate::{
    constants::SHOPPING_LIST_HEADER,
    schema::CartIngredientRow,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Ingredient amounts of every recipe in a cart, merged by (name, unit).
///
/// Two ingredients that share a name and unit collapse into one line even if
/// they are different catalog entries. Lines are sorted by (name, unit).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    lines: Vec<ShoppingListLine>,
}

impl ShoppingList {
    pub fn aggregate<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = CartIngredientRow>,
    {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        for row in rows {
            *totals.entry((row.name, row.measurement_unit)).or_insert(0) += i64::from(row.amount);
        }

        let lines = totals
            .into_iter()
            .map(|((name, measurement_unit), amount)| ShoppingListLine {
                name,
                measurement_unit,
                amount,
            })
            .collect();

        Self { lines }
    }

    pub fn lines(&self) -> &[ShoppingListLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> String {
        let mut content = format!("{SHOPPING_LIST_HEADER}\n\n");
        for line in &self.lines {
            content.push_str(&format!(
                "{} - {} {}\n",
                line.name, line.amount, line.measurement_unit
            ));
        }
        content
    }
}
