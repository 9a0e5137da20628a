use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{labeled_enum, CategoryId, NaturalKey};
use crate::errors::DomainError;

labeled_enum! {
    pub enum Severity {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Critical => "CRITICAL",
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub code: String,
    pub parent_id: Option<CategoryId>,
    pub level: u8,
    pub path: String,
    pub name: String,
    pub severity_default: Severity,
    pub sla_days: u32,
    pub requires_investigation: bool,
    pub anonymity_rate: f64,
    /// Relative share of intake volume landing under this root category.
    pub volume_weight: f64,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

impl NaturalKey for Category {
    fn natural_key(&self) -> String {
        self.code.clone()
    }
}

/// Committed category hierarchy with parent/child lookups.
#[derive(Clone, Debug)]
pub struct Taxonomy {
    categories: Vec<Category>,
    index: HashMap<CategoryId, usize>,
}

impl Taxonomy {
    /// Builds the hierarchy and checks the level/parent/inheritance rules.
    pub fn new(categories: Vec<Category>) -> Result<Self, DomainError> {
        let index = categories
            .iter()
            .enumerate()
            .map(|(position, category)| (category.id.clone(), position))
            .collect::<HashMap<_, _>>();
        let taxonomy = Self { categories, index };

        for category in &taxonomy.categories {
            match (&category.parent_id, category.level) {
                (None, 0) => {}
                (Some(parent_id), 1) => {
                    let parent = taxonomy.get(parent_id).ok_or_else(|| {
                        DomainError::InvariantViolation(format!(
                            "category {} references unknown parent {}",
                            category.code, parent_id
                        ))
                    })?;
                    if !parent.is_root() {
                        return Err(DomainError::InvariantViolation(format!(
                            "category {} is nested below non-root {}",
                            category.code, parent.code
                        )));
                    }
                    if parent.severity_default != category.severity_default
                        || parent.sla_days != category.sla_days
                    {
                        return Err(DomainError::InvariantViolation(format!(
                            "category {} does not inherit severity/SLA from {}",
                            category.code, parent.code
                        )));
                    }
                }
                (parent, level) => {
                    return Err(DomainError::InvariantViolation(format!(
                        "category {} has level {level} with parent {:?}",
                        category.code, parent
                    )));
                }
            }
        }

        Ok(taxonomy)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn all(&self) -> &[Category] {
        &self.categories
    }

    pub fn get(&self, id: &CategoryId) -> Option<&Category> {
        self.index.get(id).map(|position| &self.categories[*position])
    }

    pub fn by_code(&self, code: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.code == code)
    }

    pub fn roots(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(|category| category.is_root())
    }

    pub fn children_of<'a>(&'a self, id: &'a CategoryId) -> impl Iterator<Item = &'a Category> {
        self.categories.iter().filter(move |category| category.parent_id.as_ref() == Some(id))
    }

    /// Root of the given category (the category itself when it is a root).
    pub fn root_of(&self, id: &CategoryId) -> Option<&Category> {
        let category = self.get(id)?;
        match &category.parent_id {
            Some(parent_id) => self.get(parent_id),
            None => Some(category),
        }
    }
}
