//! Repeatable field groups.
//!
//! A field of classification `group` owns a list of items. Each item is an
//! [`Aggregate`] built from the group's child declarations, with its own
//! registry and value object. The group field's value is the array of item
//! value objects; edits inside an item flow up into that array, and values
//! assigned to the group field flow down into the items.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures::FutureExt;
use futures::future::{LocalBoxFuture, join_all};
use tracing::{debug, warn};

use formkit_model::{Value, ValueMap};

use crate::aggregate::Aggregate;
use crate::cell::ListenerId;
use crate::config::FormConfig;
use crate::declaration::FieldDeclaration;
use crate::error::Result;
use crate::field::{Field, FieldInner};

#[derive(Debug, Clone)]
struct GroupItem {
    aggregate: Aggregate,
    subscription: ListenerId,
}

/// Items of a repeatable group field.
#[derive(Debug)]
pub struct Group {
    owner: Weak<FieldInner>,
    config: Rc<FormConfig>,
    template: Vec<FieldDeclaration>,
    minimum: usize,
    items: RefCell<Vec<GroupItem>>,
    /// Set while values are pushed into items, so item events do not echo back.
    syncing: Cell<bool>,
}

/// Rows of a group value: one object per item. Non-objects read as empty rows.
fn rows_of(value: &Value) -> Vec<ValueMap> {
    match value {
        Value::Array(rows) => rows
            .iter()
            .map(|row| row.as_object().cloned().unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    }
}

/// Complete `row` with the empty value of every field `item` holds.
fn fill_row(item: &Aggregate, mut row: ValueMap) -> ValueMap {
    for field in item.fields() {
        if let Some(name) = field.name() {
            row.entry(name.to_string())
                .or_insert_with(|| field.empty_value().clone());
        }
    }
    row
}

impl Group {
    pub(crate) fn new(
        owner: Weak<FieldInner>,
        config: Rc<FormConfig>,
        template: Vec<FieldDeclaration>,
        minimum: usize,
    ) -> Self {
        Self {
            owner,
            config,
            template,
            minimum,
            items: RefCell::new(Vec::new()),
            syncing: Cell::new(false),
        }
    }

    /// Build the first items from the group's initial value.
    pub(crate) fn initialize(&self, initial: &Value) -> Result<()> {
        let rows = rows_of(initial);
        let count = rows.len().max(self.minimum);
        let mut items = Vec::with_capacity(count);
        for index in 0..count {
            items.push(self.build_item(rows.get(index).cloned().unwrap_or_default())?);
        }
        *self.items.borrow_mut() = items;
        Ok(())
    }

    fn build_item(&self, values: ValueMap) -> Result<GroupItem> {
        let aggregate = Aggregate::with_values(Rc::clone(&self.config), values);
        for decl in &self.template {
            let field = Field::new(decl.clone(), Rc::clone(&self.config))?;
            aggregate.register(&field)?;
        }
        let owner = self.owner.clone();
        let subscription = aggregate.subscribe(move |_| {
            if let Some(inner) = owner.upgrade() {
                let field = Field { inner };
                if let Some(group) = field.group() {
                    group.push_up(&field);
                }
            }
        });
        Ok(GroupItem {
            aggregate,
            subscription,
        })
    }

    /// Item aggregates in order.
    pub fn items(&self) -> Vec<Aggregate> {
        self.items
            .borrow()
            .iter()
            .map(|item| item.aggregate.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn minimum(&self) -> usize {
        self.minimum
    }

    /// Append an empty item.
    ///
    /// # Errors
    ///
    /// Fails when a child declaration names an unknown rule.
    pub fn add_item(&self) -> Result<Aggregate> {
        let item = self.build_item(ValueMap::new())?;
        let aggregate = item.aggregate.clone();
        self.items.borrow_mut().push(item);
        debug!(items = self.len(), "added group item");
        self.push_from_owner();
        Ok(aggregate)
    }

    /// Remove the item at `index`. Items below the minimum are kept.
    pub fn remove_item(&self, index: usize) -> Option<Aggregate> {
        let item = {
            let mut items = self.items.borrow_mut();
            if items.len() <= self.minimum || index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        item.aggregate.unsubscribe(item.subscription);
        debug!(items = self.len(), "removed group item");
        self.push_from_owner();
        Some(item.aggregate)
    }

    /// The group value: one object per item.
    pub fn snapshot(&self) -> Value {
        Value::Array(
            self.items
                .borrow()
                .iter()
                .map(|item| Value::Object(item.aggregate.values()))
                .collect(),
        )
    }

    fn push_from_owner(&self) {
        if let Some(inner) = self.owner.upgrade() {
            self.push_up(&Field { inner });
        }
    }

    fn push_up(&self, owner: &Field) {
        if self.syncing.get() {
            return;
        }
        owner.commit(self.snapshot());
    }

    /// Push a group value down into the items, adding or dropping items to
    /// match its length (never below the minimum).
    pub(crate) fn sync_down(&self, value: &Value) {
        let mut rows = rows_of(value).into_iter();
        let target = rows.len().max(self.minimum);
        self.syncing.set(true);

        let current = self.items();
        for item in current.iter().take(target) {
            let row = rows.next().unwrap_or_default();
            item.set_values(fill_row(item, row));
        }
        if current.len() > target {
            let dropped: Vec<GroupItem> = self.items.borrow_mut().drain(target..).collect();
            for item in dropped {
                item.aggregate.unsubscribe(item.subscription);
            }
        }
        for _ in current.len()..target {
            match self.build_item(rows.next().unwrap_or_default()) {
                Ok(item) => self.items.borrow_mut().push(item),
                Err(err) => {
                    warn!(error = %err, "could not build group item");
                    break;
                }
            }
        }

        self.syncing.set(false);
    }

    /// Resolve `true` when any item fails validation.
    pub(crate) fn validation_barrier(&self) -> LocalBoxFuture<'static, bool> {
        let barriers: Vec<_> = self
            .items()
            .iter()
            .map(Aggregate::has_validation_errors)
            .collect();
        async move { join_all(barriers).await.into_iter().any(|failing| failing) }.boxed_local()
    }

    pub(crate) fn settle(&self) -> LocalBoxFuture<'static, ()> {
        let pending: Vec<_> = self.items().iter().map(Aggregate::settle).collect();
        async move {
            for outcome in join_all(pending).await {
                if let Err(err) = outcome {
                    warn!(error = %err, "group item did not settle cleanly");
                }
            }
        }
        .boxed_local()
    }

    pub(crate) fn show_errors(&self) {
        for item in self.items() {
            item.show_errors();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group_field(minimum: usize, value: Option<Value>) -> Field {
        let mut decl = FieldDeclaration::new("group")
            .named("people")
            .with_minimum(minimum)
            .with_children(vec![
                FieldDeclaration::new("text")
                    .named("name")
                    .with_validation("required"),
                FieldDeclaration::new("email").named("email"),
            ]);
        if let Some(value) = value {
            decl = decl.with_value(value);
        }
        Field::new(decl, Rc::new(FormConfig::default())).unwrap()
    }

    #[test]
    fn test_minimum_items_created() {
        let field = group_field(2, None);
        let group = field.group().unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(
            field.value(),
            json!([{"name": "", "email": ""}, {"name": "", "email": ""}])
        );
    }

    #[test]
    fn test_initial_rows_fill_items() {
        let field = group_field(1, Some(json!([{"name": "Ada"}, {"name": "Alan"}])));
        let group = field.group().unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group.items()[1].value("name"), Some(json!("Alan")));
        assert_eq!(group.items()[1].value("email"), Some(json!("")));
    }

    #[test]
    fn test_item_edit_flows_into_group_value() {
        let field = group_field(1, None);
        let item = field.group().unwrap().items().remove(0);
        item.field("name").unwrap().edit(json!("Grace"));
        assert_eq!(field.value(), json!([{"name": "Grace", "email": ""}]));
    }

    #[test]
    fn test_assign_resizes_items() {
        let field = group_field(1, None);
        field.assign(json!([{"name": "a"}, {"name": "b"}, {"name": "c"}]));
        let group = field.group().unwrap();
        assert_eq!(group.len(), 3);
        assert_eq!(group.items()[2].field("name").unwrap().value(), json!("c"));
        field.assign(json!([]));
        assert_eq!(group.len(), 1);
        assert_eq!(field.value(), json!([{"name": "", "email": ""}]));
    }

    #[test]
    fn test_add_and_remove_respect_minimum() {
        let field = group_field(1, None);
        let group = field.group().unwrap();
        assert!(group.remove_item(0).is_none());
        group.add_item().unwrap();
        assert_eq!(field.value().as_array().map(Vec::len), Some(2));
        assert!(group.remove_item(1).is_some());
        assert_eq!(group.len(), 1);
    }
}
