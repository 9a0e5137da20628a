use crate::domain::taxonomy::Category;
use crate::domain::{CategoryId, EntityKind};
use crate::pipeline::GenerationContext;

/// Two-level taxonomy from the configured reference roots. Children inherit severity, SLA,
/// anonymity rate and volume weight from their root; codes are `{ROOT}-{NN}`.
pub fn generate_categories(context: &GenerationContext) -> Vec<Category> {
    let mut categories = Vec::with_capacity(context.config.reference.category_count());

    for root in &context.config.reference.categories {
        let root_id = CategoryId(context.entity_id(EntityKind::Category, &root.code));
        categories.push(Category {
            id: root_id.clone(),
            code: root.code.clone(),
            parent_id: None,
            level: 0,
            path: root.name.clone(),
            name: root.name.clone(),
            severity_default: root.severity,
            sla_days: root.sla_days,
            requires_investigation: root.requires_investigation,
            anonymity_rate: root.anonymity_rate,
            volume_weight: root.volume_weight,
        });

        for (position, child) in root.children.iter().enumerate() {
            let code = format!("{}-{:02}", root.code, position + 1);
            categories.push(Category {
                id: CategoryId(context.entity_id(EntityKind::Category, &code)),
                code,
                parent_id: Some(root_id.clone()),
                level: 1,
                path: format!("{} / {}", root.name, child),
                name: child.clone(),
                severity_default: root.severity,
                sla_days: root.sla_days,
                requires_investigation: root.requires_investigation,
                anonymity_rate: root.anonymity_rate,
                volume_weight: root.volume_weight,
            });
        }
    }

    categories
}
