//! Product lookup for the records an aggregation run sees

use rollup_core::{Product, ProductId};
use std::collections::HashMap;

/// Products by id, borrowed from a snapshot
#[derive(Debug, Default)]
pub struct ProductIndex<'a> {
    products: HashMap<&'a str, &'a Product>,
}

impl<'a> ProductIndex<'a> {
    pub fn new(products: &'a [Product]) -> Self {
        Self {
            products: products.iter().map(|p| (p.id.as_str(), p)).collect(),
        }
    }

    pub fn get(&self, id: &ProductId) -> Option<&'a Product> {
        self.products.get(id.as_str()).copied()
    }

    pub fn contains(&self, id: &ProductId) -> bool {
        self.products.contains_key(id.as_str())
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
