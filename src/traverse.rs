//! Context-aware schema traversal
//!
//! [`SchemaTraverser`] walks a schema tree depth-first and hands each node to a
//! [`SchemaVisitor`] twice: once before its children ([`Order::PreOrder`]) and
//! once after ([`Order::PostOrder`]).
//!
//! The context for a node is an immutable [`TraverserContext`] that links to its
//! parent's context on the call stack. Entering a field or union member does not
//! mutate anything; the child context simply records the new enclosing field or
//! member, and descendants inherit it through the link. When the subtree call
//! returns, the child context is dropped and the parent's view is what remains.
//! Two traversals therefore share no state and may run on separate threads.

use std::borrow::Cow;

use tracing::trace;

use crate::path::{PathSpec, ARRAY_ITEMS_SEGMENT, MAP_VALUES_SEGMENT};
use crate::schema::{DataSchema, Field, UnionMember};

/// Which side of a node's children a callback fires on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    PreOrder,
    PostOrder,
}

/// Snapshot of where the traversal currently is.
///
/// `'s` is the lifetime of the schema being walked, `'c` the lifetime of the
/// chain of enclosing contexts on the traversal stack.
#[derive(Debug)]
pub struct TraverserContext<'s, 'c> {
    parent: Option<&'c TraverserContext<'s, 'c>>,
    segment: Option<Cow<'s, str>>,
    schema: &'s DataSchema,
    enclosing_field: Option<&'s Field>,
    enclosing_union_member: Option<&'s UnionMember>,
    depth: usize,
}

impl<'s, 'c> TraverserContext<'s, 'c> {
    /// Context for the root of a schema tree. A named root contributes its name
    /// as the first path segment.
    pub fn root(schema: &'s DataSchema) -> Self {
        Self {
            parent: None,
            segment: schema.name().map(Cow::Borrowed),
            schema,
            enclosing_field: None,
            enclosing_union_member: None,
            depth: 0,
        }
    }

    fn child<'n>(
        &'n self,
        segment: Option<Cow<'s, str>>,
        schema: &'s DataSchema,
    ) -> TraverserContext<'s, 'n> {
        TraverserContext {
            parent: Some(self),
            segment,
            schema,
            enclosing_field: self.enclosing_field,
            enclosing_union_member: self.enclosing_union_member,
            depth: self.depth + 1,
        }
    }

    fn enter_field<'n>(&'n self, field: &'s Field) -> TraverserContext<'s, 'n> {
        let mut next = self.child(Some(Cow::Borrowed(field.name.as_str())), &field.schema);
        next.enclosing_field = Some(field);
        next
    }

    fn enter_union_member<'n>(&'n self, member: &'s UnionMember) -> TraverserContext<'s, 'n> {
        let mut next = self.child(Some(Cow::Owned(member.key())), &member.schema);
        next.enclosing_union_member = Some(member);
        next
    }

    /// The node being visited
    pub fn current_schema(&self) -> &'s DataSchema {
        self.schema
    }

    /// The node this one was reached from, if any
    pub fn parent_schema(&self) -> Option<&'s DataSchema> {
        self.parent.map(|p| p.schema)
    }

    /// Nearest record field on the way from the root to this node
    pub fn enclosing_field(&self) -> Option<&'s Field> {
        self.enclosing_field
    }

    /// Nearest union member on the way from the root to this node
    pub fn enclosing_union_member(&self) -> Option<&'s UnionMember> {
        self.enclosing_union_member
    }

    /// Distance from the root (the root is 0)
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Segment this node added to the path, if any
    pub fn segment(&self) -> Option<&str> {
        self.segment.as_deref()
    }

    /// Path segments from the root to this node, borrowed from the context chain
    pub fn path_segments(&self) -> Vec<&str> {
        let mut segments = Vec::with_capacity(self.depth + 1);
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some(segment) = ctx.segment.as_deref() {
                segments.push(segment);
            }
            current = ctx.parent;
        }
        segments.reverse();
        segments
    }

    /// An owned copy of the path to this node
    pub fn schema_path_spec(&self) -> PathSpec {
        PathSpec::new(self.path_segments())
    }
}

/// Receives traversal callbacks
pub trait SchemaVisitor<'s> {
    fn callback(&mut self, context: &TraverserContext<'s, '_>, order: Order);
}

/// Depth-first driver that visits every node of a schema tree exactly once
pub struct SchemaTraverser<'v, V> {
    visitor: &'v mut V,
    visited: usize,
}

impl<'v, V> SchemaTraverser<'v, V> {
    pub fn new(visitor: &'v mut V) -> Self {
        Self { visitor, visited: 0 }
    }

    /// Walk `schema`, returning the number of nodes visited
    pub fn traverse<'s>(mut self, schema: &'s DataSchema) -> usize
    where
        V: SchemaVisitor<'s>,
    {
        trace!(schema = %schema.display_name(), "starting schema traversal");
        let root = TraverserContext::root(schema);
        self.visit(&root);
        trace!(schema = %schema.display_name(), nodes = self.visited, "finished schema traversal");
        self.visited
    }

    fn visit<'s>(&mut self, ctx: &TraverserContext<'s, '_>)
    where
        V: SchemaVisitor<'s>,
    {
        self.visited += 1;
        self.visitor.callback(ctx, Order::PreOrder);

        match ctx.current_schema() {
            DataSchema::Record(record) => {
                for field in &record.fields {
                    self.visit(&ctx.enter_field(field));
                }
            }
            DataSchema::Union(union) => {
                for member in &union.members {
                    self.visit(&ctx.enter_union_member(member));
                }
            }
            DataSchema::Array(array) => {
                self.visit(&ctx.child(Some(Cow::Borrowed(ARRAY_ITEMS_SEGMENT)), &array.items));
            }
            DataSchema::Map(map) => {
                self.visit(&ctx.child(Some(Cow::Borrowed(MAP_VALUES_SEGMENT)), &map.values));
            }
            // The dereferenced schema sits at the same path as its typeref
            DataSchema::Typeref(typeref) => {
                self.visit(&ctx.child(None, &typeref.referenced));
            }
            DataSchema::Enum(_) | DataSchema::Fixed(_) | DataSchema::Primitive(_) => {}
        }

        self.visitor.callback(ctx, Order::PostOrder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PrimitiveKind;

    #[derive(Default)]
    struct Recorder {
        events: Vec<(Order, String, Option<String>, Option<String>)>,
    }

    impl<'s> SchemaVisitor<'s> for Recorder {
        fn callback(&mut self, context: &TraverserContext<'s, '_>, order: Order) {
            self.events.push((
                order,
                context.schema_path_spec().to_string(),
                context.enclosing_field().map(|f| f.name.clone()),
                context.enclosing_union_member().map(|m| m.key()),
            ));
        }
    }

    fn sample() -> DataSchema {
        DataSchema::record(
            "Outer",
            vec![
                Field::new("id", DataSchema::primitive(PrimitiveKind::Long)),
                Field::new(
                    "choice",
                    DataSchema::union(vec![
                        UnionMember::new(DataSchema::primitive(PrimitiveKind::Int)),
                        UnionMember::aliased(
                            "list",
                            DataSchema::array(DataSchema::primitive(PrimitiveKind::String)),
                        ),
                    ]),
                ),
                Field::new(
                    "lookup",
                    DataSchema::map(DataSchema::typeref(
                        "Url",
                        DataSchema::primitive(PrimitiveKind::String),
                    )),
                ),
            ],
        )
    }

    fn pre_order(recorder: &Recorder) -> Vec<&(Order, String, Option<String>, Option<String>)> {
        recorder
            .events
            .iter()
            .filter(|e| e.0 == Order::PreOrder)
            .collect()
    }

    #[test]
    fn test_every_node_visited_once_per_order() {
        let schema = sample();
        let mut recorder = Recorder::default();
        let visited = SchemaTraverser::new(&mut recorder).traverse(&schema);

        // Outer, id, choice, int, list, $items, lookup, Url, string
        assert_eq!(visited, 9);
        assert_eq!(recorder.events.len(), 18);
        assert_eq!(pre_order(&recorder).len(), 9);
    }

    #[test]
    fn test_paths() {
        let schema = sample();
        let mut recorder = Recorder::default();
        SchemaTraverser::new(&mut recorder).traverse(&schema);

        let paths: Vec<&str> = pre_order(&recorder).iter().map(|e| e.1.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/Outer",
                "/Outer/id",
                "/Outer/choice",
                "/Outer/choice/int",
                "/Outer/choice/list",
                "/Outer/choice/list/$items",
                "/Outer/lookup",
                "/Outer/lookup/$values",
                "/Outer/lookup/$values",
            ]
        );
    }

    #[test]
    fn test_enclosing_field_and_member_are_scoped() {
        let schema = sample();
        let mut recorder = Recorder::default();
        SchemaTraverser::new(&mut recorder).traverse(&schema);
        let events = pre_order(&recorder);

        // root has no enclosing context
        assert_eq!(events[0].2, None);
        assert_eq!(events[0].3, None);
        // direct field
        assert_eq!(events[1].2.as_deref(), Some("id"));
        assert_eq!(events[1].3, None);
        // union members inherit the enclosing field
        assert_eq!(events[3].2.as_deref(), Some("choice"));
        assert_eq!(events[3].3.as_deref(), Some("int"));
        // descendants of a member keep it
        assert_eq!(events[5].3.as_deref(), Some("list"));
        // leaving the union restores the previous (empty) member
        assert_eq!(events[6].2.as_deref(), Some("lookup"));
        assert_eq!(events[6].3, None);
    }

    #[test]
    fn test_post_order_follows_children() {
        let schema = DataSchema::array(DataSchema::primitive(PrimitiveKind::Int));
        let mut recorder = Recorder::default();
        SchemaTraverser::new(&mut recorder).traverse(&schema);

        let order: Vec<(Order, &str)> = recorder
            .events
            .iter()
            .map(|e| (e.0, e.1.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (Order::PreOrder, "/"),
                (Order::PreOrder, "/$items"),
                (Order::PostOrder, "/$items"),
                (Order::PostOrder, "/"),
            ]
        );
    }

    #[test]
    fn test_parent_schema_and_depth() {
        struct Depths(Vec<(usize, Option<&'static str>)>);
        impl<'s> SchemaVisitor<'s> for Depths {
            fn callback(&mut self, context: &TraverserContext<'s, '_>, order: Order) {
                if order == Order::PreOrder {
                    self.0.push((
                        context.depth(),
                        context.parent_schema().map(|p| p.type_keyword()),
                    ));
                }
            }
        }

        let schema = DataSchema::record(
            "R",
            vec![Field::new("f", DataSchema::primitive(PrimitiveKind::Int))],
        );
        let mut depths = Depths(Vec::new());
        SchemaTraverser::new(&mut depths).traverse(&schema);
        assert_eq!(depths.0, vec![(0, None), (1, Some("record"))]);
    }

    #[test]
    fn test_field_inside_member_keeps_outer_member() {
        let schema = DataSchema::record(
            "Envelope",
            vec![Field::new(
                "payload",
                DataSchema::union(vec![UnionMember::aliased(
                    "order",
                    DataSchema::record(
                        "Order",
                        vec![Field::new("total", DataSchema::primitive(PrimitiveKind::Double))],
                    ),
                )]),
            )],
        );
        let mut recorder = Recorder::default();
        SchemaTraverser::new(&mut recorder).traverse(&schema);
        let events = pre_order(&recorder);

        assert_eq!(events[3].1, "/Envelope/payload/order/total");
        // the nearer field replaces "payload"; the member is inherited unchanged
        assert_eq!(events[3].2.as_deref(), Some("total"));
        assert_eq!(events[3].3.as_deref(), Some("order"));
        // the member record itself still sees the outer field
        assert_eq!(events[2].2.as_deref(), Some("payload"));
        assert_eq!(events[2].3.as_deref(), Some("order"));
    }
}
