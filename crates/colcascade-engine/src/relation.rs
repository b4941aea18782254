//! Relation processing: which upstream columns an edge carries

use colcascade_core::{ArtifactType, Column, ColumnGroup, RelationType};

/// Base types treated as text when coercing measures
const TEXTUAL_TYPES: &[&str] = &["VARCHAR", "NVARCHAR", "CHAR", "NCHAR", "TEXT", "NTEXT", "STRING"];

/// Selects and pre-transforms upstream columns per relation type
///
/// Selection is independent of stages; naming and technical-field rules are
/// applied afterwards by the target's [`crate::StageRuleSet`].
#[derive(Debug, Clone)]
pub struct RelationProcessor {
    lookup_limit: usize,
    measure_type: String,
}

impl RelationProcessor {
    pub fn new(lookup_limit: usize, measure_type: impl Into<String>) -> Self {
        Self {
            lookup_limit,
            measure_type: measure_type.into(),
        }
    }

    /// Dispatch on relation type
    pub fn process(&self, relation: RelationType, columns: &[Column], target_type: ArtifactType) -> Vec<Column> {
        let selected = match relation {
            RelationType::Main => self.main(columns, target_type),
            RelationType::GetKey => self.get_key(columns),
            RelationType::Lookup => self.lookup(columns, self.lookup_limit),
            RelationType::Pbi => self.pbi(columns),
        };

        tracing::debug!(
            relation = %relation,
            upstream_columns = columns.len(),
            selected = selected.len(),
            "processed relation"
        );
        selected
    }

    /// Every upstream column; textual measures become numeric on fact targets
    pub fn main(&self, columns: &[Column], target_type: ArtifactType) -> Vec<Column> {
        columns
            .iter()
            .cloned()
            .map(|mut column| {
                if target_type == ArtifactType::Fact
                    && column.group == ColumnGroup::Measure
                    && is_textual(&column.data_type)
                {
                    column.data_type = self.measure_type.clone();
                }
                column
            })
            .collect()
    }

    /// Surrogate and business keys, in upstream order
    ///
    /// Columns named `*_SK` / `*_BK` count as keys even when tagged otherwise
    /// and are re-tagged accordingly.
    pub fn get_key(&self, columns: &[Column]) -> Vec<Column> {
        columns
            .iter()
            .filter_map(|column| key_group(column).map(|group| Column { group, ..column.clone() }))
            .collect()
    }

    /// At most `limit` columns: surrogate keys, then business keys, then attributes
    pub fn lookup(&self, columns: &[Column], limit: usize) -> Vec<Column> {
        let priority = [ColumnGroup::SurrogateKey, ColumnGroup::BusinessKey, ColumnGroup::Attribute];

        priority
            .iter()
            .flat_map(|group| columns.iter().filter(move |c| c.group == *group))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Keys and measures only
    pub fn pbi(&self, columns: &[Column]) -> Vec<Column> {
        columns
            .iter()
            .filter(|c| {
                matches!(
                    c.group,
                    ColumnGroup::SurrogateKey | ColumnGroup::BusinessKey | ColumnGroup::Measure
                )
            })
            .cloned()
            .collect()
    }
}

impl Default for RelationProcessor {
    fn default() -> Self {
        Self::new(3, "DECIMAL(18,2)")
    }
}

fn key_group(column: &Column) -> Option<ColumnGroup> {
    match column.group {
        ColumnGroup::SurrogateKey | ColumnGroup::BusinessKey => Some(column.group),
        _ if column.group.is_technical() => None,
        _ => {
            let lower = column.name.to_lowercase();
            if lower.ends_with("_sk") {
                Some(ColumnGroup::SurrogateKey)
            } else if lower.ends_with("_bk") {
                Some(ColumnGroup::BusinessKey)
            } else {
                None
            }
        }
    }
}

fn is_textual(data_type: &str) -> bool {
    let upper = data_type.trim().to_uppercase();
    let base = upper.split('(').next().unwrap_or_default().trim();
    TEXTUAL_TYPES.contains(&base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn col(name: &str, group: ColumnGroup) -> Column {
        Column::new("up", name, "INT", group)
    }

    fn names(columns: &[Column]) -> Vec<&str> {
        columns.iter().map(|c| c.name.as_str()).collect()
    }

    fn dimension_columns() -> Vec<Column> {
        vec![
            col("customer_SK", ColumnGroup::SurrogateKey),
            col("name", ColumnGroup::Attribute),
            col("region_SK", ColumnGroup::SurrogateKey),
            col("customer_BK", ColumnGroup::BusinessKey),
            col("city", ColumnGroup::Attribute),
            col("region_BK", ColumnGroup::BusinessKey),
            col("country", ColumnGroup::Attribute),
            col("segment", ColumnGroup::Attribute),
            col("tier", ColumnGroup::Attribute),
        ]
    }

    #[test]
    fn get_key_keeps_only_keys_in_order() {
        let keys = RelationProcessor::default().get_key(&dimension_columns());
        assert_eq!(names(&keys), vec!["customer_SK", "region_SK", "customer_BK", "region_BK"]);
        assert!(keys.iter().all(|c| c.group != ColumnGroup::Attribute));
    }

    #[test]
    fn get_key_recognises_key_suffixes() {
        let columns = vec![
            col("product_sk", ColumnGroup::Attribute),
            col("product_bk", ColumnGroup::Attribute),
            col("__load_sk", ColumnGroup::TechnicalField),
        ];
        let keys = RelationProcessor::default().get_key(&columns);
        assert_eq!(names(&keys), vec!["product_sk", "product_bk"]);
        assert_eq!(keys[0].group, ColumnGroup::SurrogateKey);
        assert_eq!(keys[1].group, ColumnGroup::BusinessKey);
    }

    #[test]
    fn lookup_respects_priority_and_limit() {
        let columns = vec![
            col("a1", ColumnGroup::Attribute),
            col("a2", ColumnGroup::Attribute),
            col("bk", ColumnGroup::BusinessKey),
            col("a3", ColumnGroup::Attribute),
            col("sk", ColumnGroup::SurrogateKey),
            col("a4", ColumnGroup::Attribute),
            col("a5", ColumnGroup::Attribute),
            col("a6", ColumnGroup::Attribute),
        ];
        let selected = RelationProcessor::default().lookup(&columns, 3);
        assert_eq!(names(&selected), vec!["sk", "bk", "a1"]);
    }

    #[test]
    fn lookup_never_includes_technical_fields() {
        let columns = vec![
            col("__SourceSystem", ColumnGroup::TechnicalField),
            col("__part", ColumnGroup::PartitionField),
            col("m", ColumnGroup::Measure),
        ];
        assert!(RelationProcessor::default().lookup(&columns, 10).is_empty());
    }

    #[test]
    fn pbi_keeps_keys_and_measures() {
        let columns = vec![
            col("sk", ColumnGroup::SurrogateKey),
            col("name", ColumnGroup::Attribute),
            col("amount", ColumnGroup::Measure),
            col("bk", ColumnGroup::BusinessKey),
            col("id", ColumnGroup::PrimaryKey),
        ];
        let selected = RelationProcessor::default().pbi(&columns);
        assert_eq!(names(&selected), vec!["sk", "amount", "bk"]);
    }

    #[test]
    fn main_coerces_textual_measures_on_facts() {
        let columns = vec![
            Column::new("up", "amount", "varchar(20)", ColumnGroup::Measure),
            Column::new("up", "label", "VARCHAR", ColumnGroup::Attribute),
            Column::new("up", "qty", "INT", ColumnGroup::Measure),
        ];
        let processor = RelationProcessor::default();

        let fact = processor.main(&columns, ArtifactType::Fact);
        assert_eq!(fact[0].data_type, "DECIMAL(18,2)");
        assert_eq!(fact[1].data_type, "VARCHAR");
        assert_eq!(fact[2].data_type, "INT");

        let dim = processor.main(&columns, ArtifactType::Dimension);
        assert_eq!(dim[0].data_type, "varchar(20)");
    }

    #[test]
    fn process_dispatches() {
        let processor = RelationProcessor::new(1, "DECIMAL(18,2)");
        let selected = processor.process(RelationType::Lookup, &dimension_columns(), ArtifactType::Unknown);
        assert_eq!(names(&selected), vec!["customer_SK"]);
    }
}
