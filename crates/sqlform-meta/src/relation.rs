//! Relationship descriptors.
//!
//! A [`RelationInfo`] records one relationship attribute plus the pieces of
//! both mappers needed to answer identity-key questions: which local columns
//! hold the related row's primary key, in primary key order. When the
//! declared pairs do not cover the whole related key, the descriptor falls
//! back to the parent table's declared foreign key constraints.

use std::collections::HashSet;

use serde::Serialize;

use sqlform_core::mapper::{EntityKey, ForeignKeyDef, MapperDef, RelationDef, RelationKind};

/// Descriptor for one relationship attribute.
#[derive(Debug, Clone, Serialize)]
pub struct RelationInfo {
    def: RelationDef,
    parent: EntityKey,
    parent_table: String,
    parent_foreign_keys: Vec<ForeignKeyDef>,
    related_table: String,
    related_pk: Vec<String>,
}

impl RelationInfo {
    /// Build a descriptor once both mappers are registered.
    #[must_use]
    pub fn from_def(def: RelationDef, parent: &MapperDef, related: &MapperDef) -> Self {
        let related_pk = related
            .table
            .primary_key_columns()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        Self {
            def,
            parent: parent.entity.clone(),
            parent_table: parent.table.name.clone(),
            parent_foreign_keys: parent.table.foreign_keys.clone(),
            related_table: related.table.name.clone(),
            related_pk,
        }
    }

    /// Attribute name on the owning class.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Owning class token.
    #[must_use]
    pub fn parent(&self) -> &EntityKey {
        &self.parent
    }

    /// Target class token.
    #[must_use]
    pub fn target(&self) -> &EntityKey {
        &self.def.target
    }

    /// Kind and direction.
    #[must_use]
    pub const fn kind(&self) -> RelationKind {
        self.def.kind
    }

    /// Reverse attribute on the target, when declared.
    #[must_use]
    pub fn back_populates(&self) -> Option<&str> {
        self.def.back_populates.as_deref()
    }

    /// Declared `(local, remote)` column pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.def.pairs
    }

    /// Local (owning-side) columns of the declared pairs.
    #[must_use]
    pub fn local_columns(&self) -> Vec<&str> {
        self.def.local_columns()
    }

    /// Related primary key column names, in key order.
    #[must_use]
    pub fn related_primary_key(&self) -> &[String] {
        &self.related_pk
    }

    /// `(local column, related pk column)` pairs ordered by the related
    /// primary key, for identity-key reconstruction.
    ///
    /// The declared pairs are used when they cover the whole related key.
    /// Otherwise the parent's declared foreign key constraints are scanned
    /// for exactly one constraint that targets the related key and agrees
    /// with every declared pair; its positional mapping completes the
    /// pairing. Zero or several candidate constraints degrade silently to
    /// the incomplete declared pairing.
    #[must_use]
    pub fn pairs_for_identity_key(&self) -> Vec<(String, String)> {
        // Declared pairs that actually target the related primary key,
        // ordered by that key.
        let simple: Vec<(String, String)> = self
            .related_pk
            .iter()
            .filter_map(|pk| {
                self.def
                    .pairs
                    .iter()
                    .find(|(_, remote)| remote == pk)
                    .map(|(local, _)| (local.clone(), pk.clone()))
            })
            .collect();

        if simple.len() == self.related_pk.len() {
            return simple;
        }

        let pk_set: HashSet<&str> = self.related_pk.iter().map(String::as_str).collect();
        let candidates: Vec<&ForeignKeyDef> = self
            .parent_foreign_keys
            .iter()
            .filter(|fk| {
                fk.referred_table == self.related_table
                    && fk.referred_columns.len() == pk_set.len()
                    && fk
                        .referred_columns
                        .iter()
                        .map(String::as_str)
                        .collect::<HashSet<_>>()
                        == pk_set
                    && simple.iter().all(|(local, remote)| {
                        fk.columns
                            .iter()
                            .zip(&fk.referred_columns)
                            .any(|(c, r)| c == local && r == remote)
                    })
            })
            .collect();

        if candidates.len() == 1 {
            let fk = candidates[0];
            return self
                .related_pk
                .iter()
                .filter_map(|pk| {
                    fk.referred_columns
                        .iter()
                        .position(|r| r == pk)
                        .map(|i| (fk.columns[i].clone(), pk.clone()))
                })
                .collect();
        }

        tracing::debug!(
            model = %self.parent,
            relation = %self.def.name,
            candidates = candidates.len(),
            "Identity-key pairing incomplete; falling back to declared pairs"
        );
        simple
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlform_core::mapper::{ColumnDef, TableDef};
    use sqlform_core::types::LogicalType;

    fn owner_mapper() -> MapperDef {
        MapperDef::new(
            "Owner",
            TableDef::new("owners")
                .column(ColumnDef::new("first_name", LogicalType::Text).primary_key())
                .column(ColumnDef::new("last_name", LogicalType::Text).primary_key()),
        )
    }

    fn vehicle_table() -> TableDef {
        TableDef::new("vehicles")
            .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
            .column(ColumnDef::new("owner_first", LogicalType::Text))
            .column(ColumnDef::new("owner_last", LogicalType::Text))
    }

    #[test]
    fn test_complete_pairs_ordered_by_related_key() {
        let parent = MapperDef::new("Vehicle", vehicle_table());
        let related = owner_mapper();
        // Declared out of key order on purpose.
        let def = RelationDef::new("owner", "Owner")
            .pair("owner_last", "last_name")
            .pair("owner_first", "first_name");
        let info = RelationInfo::from_def(def, &parent, &related);
        assert_eq!(
            info.pairs_for_identity_key(),
            vec![
                ("owner_first".to_string(), "first_name".to_string()),
                ("owner_last".to_string(), "last_name".to_string()),
            ]
        );
    }

    #[test]
    fn test_single_constraint_completes_pairing() {
        let parent = MapperDef::new(
            "Vehicle",
            vehicle_table().foreign_key(
                ForeignKeyDef::new("owners")
                    .pair("owner_first", "first_name")
                    .pair("owner_last", "last_name"),
            ),
        );
        let related = owner_mapper();
        // Only one half of the composite key is declared on the relation.
        let def = RelationDef::new("owner", "Owner").pair("owner_first", "first_name");
        let info = RelationInfo::from_def(def, &parent, &related);
        assert_eq!(
            info.pairs_for_identity_key(),
            vec![
                ("owner_first".to_string(), "first_name".to_string()),
                ("owner_last".to_string(), "last_name".to_string()),
            ]
        );
    }

    #[test]
    fn test_ambiguous_constraints_fall_back() {
        let parent = MapperDef::new(
            "Vehicle",
            vehicle_table()
                .column(ColumnDef::new("seller_first", LogicalType::Text))
                .column(ColumnDef::new("seller_last", LogicalType::Text))
                .foreign_key(
                    ForeignKeyDef::new("owners")
                        .pair("owner_first", "first_name")
                        .pair("owner_last", "last_name"),
                )
                .foreign_key(
                    ForeignKeyDef::new("owners")
                        .pair("seller_first", "first_name")
                        .pair("seller_last", "last_name"),
                ),
        );
        let related = owner_mapper();
        // No declared pairs at all: both constraints are candidates.
        let def = RelationDef::new("owner", "Owner");
        let info = RelationInfo::from_def(def, &parent, &related);
        assert_eq!(info.pairs_for_identity_key(), Vec::new());
    }

    #[test]
    fn test_known_pair_filters_constraints() {
        let parent = MapperDef::new(
            "Vehicle",
            vehicle_table()
                .column(ColumnDef::new("seller_first", LogicalType::Text))
                .column(ColumnDef::new("seller_last", LogicalType::Text))
                .foreign_key(
                    ForeignKeyDef::new("owners")
                        .pair("owner_first", "first_name")
                        .pair("owner_last", "last_name"),
                )
                .foreign_key(
                    ForeignKeyDef::new("owners")
                        .pair("seller_first", "first_name")
                        .pair("seller_last", "last_name"),
                ),
        );
        let related = owner_mapper();
        // The declared pair disambiguates: only the owner_* constraint
        // agrees with it.
        let def = RelationDef::new("owner", "Owner").pair("owner_first", "first_name");
        let info = RelationInfo::from_def(def, &parent, &related);
        assert_eq!(
            info.pairs_for_identity_key(),
            vec![
                ("owner_first".to_string(), "first_name".to_string()),
                ("owner_last".to_string(), "last_name".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_constraint_falls_back_to_partial() {
        let parent = MapperDef::new("Vehicle", vehicle_table());
        let related = owner_mapper();
        let def = RelationDef::new("owner", "Owner").pair("owner_first", "first_name");
        let info = RelationInfo::from_def(def, &parent, &related);
        assert_eq!(
            info.pairs_for_identity_key(),
            vec![("owner_first".to_string(), "first_name".to_string())]
        );
    }

    #[test]
    fn test_constraint_against_other_table_ignored() {
        let parent = MapperDef::new(
            "Vehicle",
            vehicle_table().foreign_key(
                ForeignKeyDef::new("dealers")
                    .pair("owner_first", "first_name")
                    .pair("owner_last", "last_name"),
            ),
        );
        let related = owner_mapper();
        let def = RelationDef::new("owner", "Owner").pair("owner_first", "first_name");
        let info = RelationInfo::from_def(def, &parent, &related);
        assert_eq!(info.pairs_for_identity_key().len(), 1);
    }
}
