//! Category reference resolver.
//!
//! Expands extend-nodes by splicing the referenced category's own criterias
//! into the sibling list in place of the reference, depth first, preserving
//! sibling order. Resolution is fail-fast: a missing category aborts the
//! whole walk. A visited set guards against reference cycles and a depth
//! bound caps pathological nesting; both travel through the recursive walk.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use super::types::Criterion;
use super::CriteriaError;
use crate::models::{Category, CategoryKind};

/// Maximum reference expansion depth.
pub const MAX_RESOLVE_DEPTH: usize = 16;

/// Category lookup collaborator.
#[async_trait]
pub trait CategorySource: Send + Sync {
    /// Find a category by name, optionally narrowed to a kind.
    async fn find(
        &self,
        name: &str,
        kind: Option<CategoryKind>,
    ) -> anyhow::Result<Option<Category>>;
}

/// Expands category references against a [`CategorySource`].
pub struct Resolver<'a> {
    source: &'a dyn CategorySource,
}

impl<'a> Resolver<'a> {
    pub fn new(source: &'a dyn CategorySource) -> Self {
        Self { source }
    }

    /// Resolve a criterion sequence into one containing only join and field
    /// nodes. Re-run on every use; expanded forms are never cached.
    pub async fn resolve(&self, criterias: &[Criterion]) -> Result<Vec<Criterion>, CriteriaError> {
        let mut visited = HashSet::new();
        self.resolve_inner(criterias, &mut visited, 0).await
    }

    fn resolve_inner<'s>(
        &'s self,
        criterias: &'s [Criterion],
        visited: &'s mut HashSet<String>,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Criterion>, CriteriaError>> + Send + 's>> {
        Box::pin(async move {
            if depth > MAX_RESOLVE_DEPTH {
                return Err(CriteriaError::DepthExceeded);
            }

            let mut resolved = Vec::with_capacity(criterias.len());

            for criterion in criterias {
                match criterion {
                    Criterion::Join {
                        operator,
                        conditions,
                    } => {
                        let conditions =
                            self.resolve_inner(conditions, visited, depth + 1).await?;
                        resolved.push(Criterion::Join {
                            operator: *operator,
                            conditions,
                        });
                    }
                    Criterion::Extend { category, kind } => {
                        if !visited.insert(category.clone()) {
                            return Err(CriteriaError::CyclicReference(category.clone()));
                        }

                        let found = self
                            .source
                            .find(category, *kind)
                            .await?
                            .ok_or_else(|| CriteriaError::CategoryNotFound(category.clone()))?;

                        let expanded = self
                            .resolve_inner(&found.criterias.0, visited, depth + 1)
                            .await?;
                        resolved.extend(expanded);

                        visited.remove(category);
                    }
                    field @ Criterion::Field { .. } => resolved.push(field.clone()),
                }
            }

            Ok(resolved)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::criteria::types::{ComparisonOp, CriterionValue, JoinOperator};
    use sqlx::types::Json;
    use std::collections::HashMap;

    /// In-memory category source keyed by name.
    struct StubSource {
        categories: HashMap<String, Category>,
    }

    impl StubSource {
        fn new(entries: Vec<(&str, CategoryKind, Vec<Criterion>)>) -> Self {
            let categories = entries
                .into_iter()
                .enumerate()
                .map(|(i, (name, kind, criterias))| {
                    (
                        name.to_string(),
                        Category {
                            id: i as i32 + 1,
                            name: name.to_string(),
                            kind,
                            criterias: Json(criterias),
                        },
                    )
                })
                .collect();
            Self { categories }
        }
    }

    #[async_trait]
    impl CategorySource for StubSource {
        async fn find(
            &self,
            name: &str,
            kind: Option<CategoryKind>,
        ) -> anyhow::Result<Option<Category>> {
            Ok(self
                .categories
                .get(name)
                .filter(|c| kind.is_none_or(|k| c.kind == k))
                .cloned())
        }
    }

    fn price_below(limit: i64) -> Criterion {
        Criterion::Field {
            field: "price".to_string(),
            comparison: ComparisonOp::Lt,
            value: CriterionValue::Integer(limit),
        }
    }

    fn extend(name: &str, kind: Option<CategoryKind>) -> Criterion {
        Criterion::Extend {
            category: name.to_string(),
            kind,
        }
    }

    fn leaf_count(criterias: &[Criterion]) -> usize {
        criterias
            .iter()
            .map(|c| match c {
                Criterion::Join { conditions, .. } => leaf_count(conditions),
                Criterion::Field { .. } => 1,
                Criterion::Extend { .. } => 0,
            })
            .sum()
    }

    fn has_extend(criterias: &[Criterion]) -> bool {
        criterias.iter().any(|c| match c {
            Criterion::Join { conditions, .. } => has_extend(conditions),
            Criterion::Extend { .. } => true,
            Criterion::Field { .. } => false,
        })
    }

    #[tokio::test]
    async fn field_nodes_pass_through_unchanged() {
        let source = StubSource::new(vec![]);
        let criterias = vec![price_below(3000)];

        let resolved = Resolver::new(&source).resolve(&criterias).await.unwrap();
        assert_eq!(resolved, criterias);
    }

    #[tokio::test]
    async fn splices_reference_in_place_preserving_order() {
        let source = StubSource::new(vec![(
            "cheap",
            CategoryKind::Category,
            vec![price_below(1000)],
        )]);
        let criterias = vec![
            price_below(9000),
            extend("cheap", None),
            Criterion::Field {
                field: "name".to_string(),
                comparison: ComparisonOp::Eq,
                value: CriterionValue::String("air".to_string()),
            },
        ];

        let resolved = Resolver::new(&source).resolve(&criterias).await.unwrap();

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0], price_below(9000));
        assert_eq!(resolved[1], price_below(1000));
        assert!(matches!(&resolved[2], Criterion::Field { field, .. } if field == "name"));
    }

    #[tokio::test]
    async fn expands_references_inside_join_nodes() {
        let source = StubSource::new(vec![
            (
                "nike",
                CategoryKind::Brand,
                vec![Criterion::Join {
                    operator: JoinOperator::Or,
                    conditions: vec![
                        Criterion::Field {
                            field: "model".to_string(),
                            comparison: ComparisonOp::MatchesSensitive,
                            value: CriterionValue::String("nike".to_string()),
                        },
                        Criterion::Field {
                            field: "name".to_string(),
                            comparison: ComparisonOp::MatchesInsensitive,
                            value: CriterionValue::String("nike".to_string()),
                        },
                    ],
                }],
            ),
            (
                "adidas",
                CategoryKind::Brand,
                vec![Criterion::Join {
                    operator: JoinOperator::Or,
                    conditions: vec![
                        Criterion::Field {
                            field: "model".to_string(),
                            comparison: ComparisonOp::MatchesSensitive,
                            value: CriterionValue::String("adidas".to_string()),
                        },
                        Criterion::Field {
                            field: "name".to_string(),
                            comparison: ComparisonOp::MatchesInsensitive,
                            value: CriterionValue::String("adidas".to_string()),
                        },
                    ],
                }],
            ),
        ]);

        let criterias = vec![Criterion::Join {
            operator: JoinOperator::Or,
            conditions: vec![
                extend("nike", Some(CategoryKind::Brand)),
                extend("adidas", Some(CategoryKind::Brand)),
            ],
        }];

        let resolved = Resolver::new(&source).resolve(&criterias).await.unwrap();

        assert!(!has_extend(&resolved));
        // Each brand contributes its two leaf predicates.
        assert_eq!(leaf_count(&resolved), 4);
        match &resolved[0] {
            Criterion::Join {
                operator,
                conditions,
            } => {
                assert_eq!(*operator, JoinOperator::Or);
                assert_eq!(conditions.len(), 2);
            }
            other => panic!("expected join node, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transitive_references_fully_expand() {
        let source = StubSource::new(vec![
            ("cheap", CategoryKind::Category, vec![price_below(1000)]),
            (
                "cheap-kids",
                CategoryKind::Category,
                vec![
                    extend("cheap", None),
                    Criterion::Field {
                        field: "sizes".to_string(),
                        comparison: ComparisonOp::ContainAll,
                        value: CriterionValue::List(vec![CriterionValue::Integer(36)]),
                    },
                ],
            ),
        ]);
        let criterias = vec![extend("cheap-kids", None)];

        let resolved = Resolver::new(&source).resolve(&criterias).await.unwrap();

        assert!(!has_extend(&resolved));
        assert_eq!(leaf_count(&resolved), 2);
        assert_eq!(resolved[0], price_below(1000));
    }

    #[tokio::test]
    async fn missing_reference_fails_naming_the_category() {
        let source = StubSource::new(vec![(
            "cheap",
            CategoryKind::Category,
            vec![price_below(1000)],
        )]);
        let criterias = vec![Criterion::Join {
            operator: JoinOperator::And,
            conditions: vec![extend("cheap", None), extend("not-existing-category", None)],
        }];

        let err = Resolver::new(&source)
            .resolve(&criterias)
            .await
            .unwrap_err();

        assert!(
            matches!(&err, CriteriaError::CategoryNotFound(name) if name == "not-existing-category"),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn kind_mismatch_is_not_found() {
        let source = StubSource::new(vec![(
            "nike",
            CategoryKind::Brand,
            vec![price_below(1000)],
        )]);
        let criterias = vec![extend("nike", Some(CategoryKind::Model))];

        let err = Resolver::new(&source)
            .resolve(&criterias)
            .await
            .unwrap_err();
        assert!(matches!(err, CriteriaError::CategoryNotFound(_)));
    }

    #[tokio::test]
    async fn direct_cycle_is_detected() {
        let source = StubSource::new(vec![(
            "ouroboros",
            CategoryKind::Category,
            vec![extend("ouroboros", None)],
        )]);
        let criterias = vec![extend("ouroboros", None)];

        let err = Resolver::new(&source)
            .resolve(&criterias)
            .await
            .unwrap_err();
        assert!(
            matches!(&err, CriteriaError::CyclicReference(name) if name == "ouroboros"),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn mutual_cycle_is_detected() {
        let source = StubSource::new(vec![
            ("alpha", CategoryKind::Category, vec![extend("beta", None)]),
            ("beta", CategoryKind::Category, vec![extend("alpha", None)]),
        ]);
        let criterias = vec![extend("alpha", None)];

        let err = Resolver::new(&source)
            .resolve(&criterias)
            .await
            .unwrap_err();
        assert!(matches!(err, CriteriaError::CyclicReference(_)));
    }

    #[tokio::test]
    async fn repeated_reference_on_siblings_is_not_a_cycle() {
        // The same category referenced twice at the same level is legal;
        // only a reference chain revisiting itself is cyclic.
        let source = StubSource::new(vec![(
            "cheap",
            CategoryKind::Category,
            vec![price_below(1000)],
        )]);
        let criterias = vec![extend("cheap", None), extend("cheap", None)];

        let resolved = Resolver::new(&source).resolve(&criterias).await.unwrap();
        assert_eq!(leaf_count(&resolved), 2);
    }

    #[tokio::test]
    async fn depth_bound_caps_join_nesting() {
        let mut tree = price_below(1);
        for _ in 0..(MAX_RESOLVE_DEPTH + 2) {
            tree = Criterion::Join {
                operator: JoinOperator::And,
                conditions: vec![tree],
            };
        }
        let source = StubSource::new(vec![]);

        let err = Resolver::new(&source).resolve(&[tree]).await.unwrap_err();
        assert!(matches!(err, CriteriaError::DepthExceeded));
    }
}
