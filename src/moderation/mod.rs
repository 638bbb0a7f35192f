//! Moderation cache for the admin surface.
//!
//! Three lists (`pending`, `approved`, `rejected`) are cached after their first
//! fetch and only reconciled with the backend on a forced refresh. Approve and
//! reject results are folded in optimistically through [`reduce`], whose key
//! synthesis rule lives in [`destination_key`].

pub mod console;

pub use self::console::{ListingSource, ModerationConsole};

use crate::error::Error;
use std::{fmt, str::FromStr};

const PENDING_PREFIX: &str = "pending/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Pending,
    Approved,
    Rejected,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Pending, Category::Approved, Category::Rejected];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Pending => "pending",
            Category::Approved => "approved",
            Category::Rejected => "rejected",
        }
    }

    /// Backend listing path for this category.
    pub fn path(self) -> String {
        format!("/admin/{}", self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Category::Pending),
            "approved" => Ok(Category::Approved),
            "rejected" => Ok(Category::Rejected),
            other => Err(Error::Validation(format!(
                "unknown category {other:?}, expected pending, approved or rejected"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Reject,
}

impl ModerationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
        }
    }

    pub fn path(self) -> String {
        format!("/admin/{}", self.as_str())
    }

    /// The list an item moves into.
    pub fn destination(self) -> Category {
        match self {
            ModerationAction::Approve => Category::Approved,
            ModerationAction::Reject => Category::Rejected,
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approve" => Ok(ModerationAction::Approve),
            "reject" => Ok(ModerationAction::Reject),
            other => Err(Error::Validation(format!(
                "unknown action {other:?}, expected approve or reject"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationItem {
    pub key: String,
    /// Absent for records synthesized after a moderation action.
    pub preview_url: Option<String>,
    pub size: Option<u64>,
    pub last_modified: Option<String>,
}

impl ModerationItem {
    pub fn synthesized(key: String) -> Self {
        Self {
            key,
            preview_url: None,
            size: None,
            last_modified: None,
        }
    }
}

/// Successful moderation response; keys are echoed by the backend when known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModerationOutcome {
    pub approved_key: Option<String>,
    pub rejected_key: Option<String>,
}

impl ModerationOutcome {
    pub fn echoed_key(&self, action: ModerationAction) -> Option<&str> {
        let key = match action {
            ModerationAction::Approve => self.approved_key.as_deref(),
            ModerationAction::Reject => self.rejected_key.as_deref(),
        };
        key.filter(|k| !k.is_empty())
    }
}

/// Handle for an in-flight listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub category: Category,
    seq: u64,
}

#[derive(Debug, Clone, Default)]
struct CategoryList {
    items: Vec<ModerationItem>,
    fetched: bool,
    latest_seq: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ModerationCache {
    pending: CategoryList,
    approved: CategoryList,
    rejected: CategoryList,
    next_seq: u64,
}

impl ModerationCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self, category: Category) -> &CategoryList {
        match category {
            Category::Pending => &self.pending,
            Category::Approved => &self.approved,
            Category::Rejected => &self.rejected,
        }
    }

    fn list_mut(&mut self, category: Category) -> &mut CategoryList {
        match category {
            Category::Pending => &mut self.pending,
            Category::Approved => &mut self.approved,
            Category::Rejected => &mut self.rejected,
        }
    }

    pub fn items(&self, category: Category) -> &[ModerationItem] {
        &self.list(category).items
    }

    pub fn count(&self, category: Category) -> usize {
        self.list(category).items.len()
    }

    /// Whether a server listing has been stored for the category.
    pub fn is_fetched(&self, category: Category) -> bool {
        self.list(category).fetched
    }

    /// Replaces a category with a server listing.
    pub fn replace(&mut self, category: Category, items: Vec<ModerationItem>) {
        let list = self.list_mut(category);
        list.items = items;
        list.fetched = true;
    }

    /// Registers a new listing request; only the newest ticket per category may land.
    ///
    /// [`ModerationConsole`](console::ModerationConsole) refreshes through
    /// `&mut self`, so its own requests never overlap and its tickets always
    /// land. The check matters to callers that fetch from several tasks and
    /// fold the results into one cache.
    pub fn begin_fetch(&mut self, category: Category) -> FetchTicket {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.list_mut(category).latest_seq = seq;
        FetchTicket { category, seq }
    }

    /// Stores a listing unless a newer request for the same category was issued.
    /// Returns whether the listing was applied.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, items: Vec<ModerationItem>) -> bool {
        if self.list(ticket.category).latest_seq != ticket.seq {
            return false;
        }
        self.replace(ticket.category, items);
        true
    }

    /// Case-insensitive key filter over one category. The cache is not touched.
    pub fn filter(&self, category: Category, query: &str) -> Vec<&ModerationItem> {
        filter_items(self.items(category), query)
    }
}

/// Case-insensitive substring match on item keys; an empty query keeps everything.
pub fn filter_items<'a>(items: &'a [ModerationItem], query: &str) -> Vec<&'a ModerationItem> {
    let query = query.trim().to_lowercase();
    items
        .iter()
        .filter(|item| query.is_empty() || item.key.to_lowercase().contains(&query))
        .collect()
}

/// Key an item gets after moderation when the backend does not echo one:
/// the leading `pending/` segment becomes `approved/` or `rejected/`.
pub fn destination_key(action: ModerationAction, key: &str) -> String {
    match key.strip_prefix(PENDING_PREFIX) {
        Some(rest) => format!("{}/{rest}", action.destination().as_str()),
        None => key.to_string(),
    }
}

/// Folds a successful moderation into the cache: the key leaves `pending` and a
/// synthesized record is put at the head of the destination list.
pub fn reduce(
    mut cache: ModerationCache,
    action: ModerationAction,
    key: &str,
    outcome: &ModerationOutcome,
) -> ModerationCache {
    cache.pending.items.retain(|item| item.key != key);

    let new_key = outcome
        .echoed_key(action)
        .map_or_else(|| destination_key(action, key), str::to_string);

    cache
        .list_mut(action.destination())
        .items
        .insert(0, ModerationItem::synthesized(new_key));

    cache
}
