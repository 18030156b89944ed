//! Year → (quarter) → month → week trees for treemap and sunburst views
//!
//! Nodes live in an arena owned by [`Hierarchy`]; children and the parent back-reference
//! are plain [`NodeId`] indices, so drilling up never needs a walk from the root.
//! Every month (and quarter) of the year and every week a month spans is materialized,
//! empty or not, so consumers always get a complete axis.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeSet, VecDeque};

use crate::grouping::{month_index, week_number, weeks_in_month, MONTH_NAMES};
use crate::metrics::GroupMetrics;
use crate::models::Activity;

/// Index of a node inside its [`Hierarchy`]
pub type NodeId = usize;

/// Id of the sentinel root returned for empty input
pub const EMPTY_NODE_ID: &str = "empty";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeLevel {
    Year,
    Quarter,
    Month,
    Week,
}

/// Shape of the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HierarchyLayout {
    /// year → month → week
    #[default]
    MonthWeek,
    /// year → quarter → month
    QuarterMonth,
    /// year → quarter → month → week
    QuarterMonthWeek,
}

impl std::str::FromStr for HierarchyLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "month-week" | "month" => Ok(HierarchyLayout::MonthWeek),
            "quarter-month" | "quarter" => Ok(HierarchyLayout::QuarterMonth),
            "quarter-month-week" | "full" => Ok(HierarchyLayout::QuarterMonthWeek),
            _ => Err(format!("Invalid hierarchy layout: {}", s)),
        }
    }
}

impl std::fmt::Display for HierarchyLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HierarchyLayout::MonthWeek => "month-week",
            HierarchyLayout::QuarterMonth => "quarter-month",
            HierarchyLayout::QuarterMonthWeek => "quarter-month-week",
        };
        f.write_str(name)
    }
}

/// Navigation direction between siblings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    /// Unique id, e.g. `2024-Jan-W3`
    pub id: String,

    /// Display name, e.g. `2024 Jan`
    pub name: String,

    pub level: NodeLevel,

    /// Cumulative distance in km
    pub value: Decimal,

    /// Number of activities below this node
    pub count: usize,

    /// Average pace over every activity below this node
    pub avg_pace: String,
    pub avg_pace_seconds: Decimal,
    pub avg_bpm: Decimal,

    /// Explicit sort key: quarter index, month index or week number
    pub order: Option<u32>,

    /// Ids of the activities of a leaf node
    pub activity_ids: Vec<String>,

    pub children: Vec<NodeId>,

    /// Non-owning back-reference, `None` for the root
    pub parent: Option<NodeId>,

    pub depth: usize,
}

impl HierarchyNode {
    fn new(id: String, name: String, level: NodeLevel, order: Option<u32>) -> Self {
        HierarchyNode {
            id,
            name,
            level,
            value: Decimal::ZERO,
            count: 0,
            avg_pace: String::new(),
            avg_pace_seconds: Decimal::ZERO,
            avg_bpm: Decimal::ZERO,
            order,
            activity_ids: Vec::new(),
            children: Vec::new(),
            parent: None,
            depth: 0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Sibling ordering: nodes with an `order` come first, ascending; the rest sort by
/// descending value.
pub fn compare_siblings(a: &HierarchyNode, b: &HierarchyNode) -> Ordering {
    match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.value.cmp(&a.value),
    }
}

/// Aggregation tree over one year of activities
#[derive(Debug, Clone, PartialEq)]
pub struct Hierarchy {
    nodes: Vec<HierarchyNode>,
    root: NodeId,
    layout: HierarchyLayout,
}

/// Owned nested form, used for serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedNode {
    pub id: String,
    pub name: String,
    pub level: NodeLevel,
    pub value: Decimal,
    pub count: usize,
    pub avg_pace: String,
    pub avg_bpm: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NestedNode>,
}

struct TreeBuilder<'a> {
    nodes: Vec<HierarchyNode>,
    members: Vec<Vec<&'a Activity>>,
}

impl<'a> TreeBuilder<'a> {
    fn push(
        &mut self,
        parent: Option<NodeId>,
        id: String,
        name: String,
        level: NodeLevel,
        order: Option<u32>,
    ) -> NodeId {
        let node_id = self.nodes.len();
        let mut node = HierarchyNode::new(id, name, level, order);
        node.parent = parent;
        if let Some(p) = parent {
            node.depth = self.nodes[p].depth + 1;
            self.nodes[p].children.push(node_id);
        }
        self.nodes.push(node);
        self.members.push(Vec::new());
        node_id
    }

    fn add_month(&mut self, parent: NodeId, year: i32, month0: u32, members: Vec<&'a Activity>, with_weeks: bool) {
        let month_name = MONTH_NAMES[month0 as usize];
        let month_id = format!("{}-{}", year, month_name);
        let month = self.push(
            Some(parent),
            month_id.clone(),
            format!("{} {}", year, month_name),
            NodeLevel::Month,
            Some(month0),
        );

        if !with_weeks {
            self.members[month] = members;
            return;
        }

        // Activities from other years keep their own week numbers; make room for them
        // so no distance falls out of the tree.
        let mut weeks: BTreeSet<u32> = weeks_in_month(year, month0).into_iter().collect();
        weeks.extend(members.iter().map(|a| week_number(a.day())));

        for week in weeks {
            let leaf = self.push(
                Some(month),
                format!("{}-W{}", month_id, week),
                format!("W{}", week),
                NodeLevel::Week,
                Some(week),
            );
            self.members[leaf] = members
                .iter()
                .copied()
                .filter(|a| week_number(a.day()) == week)
                .collect();
        }
    }

    /// Post-order pass: leaves aggregate their activities, parents sum their children
    /// and average over their full leaf membership.
    fn finalize(&mut self, node_id: NodeId) -> Vec<&'a Activity> {
        let children = self.nodes[node_id].children.clone();

        let members = if children.is_empty() {
            let leaf_members = std::mem::take(&mut self.members[node_id]);
            let node = &mut self.nodes[node_id];
            node.value = leaf_members.iter().map(|a| a.distance).sum();
            node.count = leaf_members.len();
            node.activity_ids = leaf_members.iter().map(|a| a.id.clone()).collect();
            leaf_members
        } else {
            let mut all = Vec::new();
            let mut value = Decimal::ZERO;
            let mut count = 0;
            for child in &children {
                all.extend(self.finalize(*child));
                value += self.nodes[*child].value;
                count += self.nodes[*child].count;
            }
            let node = &mut self.nodes[node_id];
            node.value = value;
            node.count = count;
            all
        };

        let metrics = GroupMetrics::from_activities(members.iter().copied());
        let node = &mut self.nodes[node_id];
        node.avg_pace_seconds = metrics.avg_pace_seconds;
        node.avg_pace = metrics.avg_pace();
        node.avg_bpm = metrics.avg_bpm;

        self.sort_children(node_id);
        members
    }

    fn sort_children(&mut self, node_id: NodeId) {
        let mut children = std::mem::take(&mut self.nodes[node_id].children);
        children.sort_by(|a, b| compare_siblings(&self.nodes[*a], &self.nodes[*b]));
        self.nodes[node_id].children = children;
    }
}

impl Hierarchy {
    /// Build the tree for the year of the first activity.
    ///
    /// Callers are expected to pass a single year; activities from other years are
    /// bucketed under the first activity's year by month. Empty input yields the
    /// sentinel root (`id = "empty"`).
    pub fn build(activities: &[Activity], layout: HierarchyLayout) -> Self {
        let Some(first) = activities.first() else {
            return Hierarchy::empty(layout);
        };
        let year = first.year();

        let mut builder = TreeBuilder {
            nodes: Vec::new(),
            members: Vec::new(),
        };
        let root = builder.push(None, year.to_string(), year.to_string(), NodeLevel::Year, None);

        let mut by_month: Vec<Vec<&Activity>> = vec![Vec::new(); 12];
        for activity in activities {
            by_month[month_index(activity.day()) as usize].push(activity);
        }

        match layout {
            HierarchyLayout::MonthWeek => {
                for (month0, members) in by_month.into_iter().enumerate() {
                    builder.add_month(root, year, month0 as u32, members, true);
                }
            }
            HierarchyLayout::QuarterMonth | HierarchyLayout::QuarterMonthWeek => {
                let with_weeks = layout == HierarchyLayout::QuarterMonthWeek;
                let mut months = by_month.into_iter().enumerate();
                for quarter in 0..4u32 {
                    let q = builder.push(
                        Some(root),
                        format!("{}-Q{}", year, quarter + 1),
                        format!("Q{}", quarter + 1),
                        NodeLevel::Quarter,
                        Some(quarter),
                    );
                    for (month0, members) in months.by_ref().take(3) {
                        builder.add_month(q, year, month0 as u32, members, with_weeks);
                    }
                }
            }
        }

        builder.finalize(root);

        tracing::debug!(
            year,
            ?layout,
            nodes = builder.nodes.len(),
            activities = activities.len(),
            "Built activity hierarchy"
        );

        Hierarchy {
            nodes: builder.nodes,
            root,
            layout,
        }
    }

    fn empty(layout: HierarchyLayout) -> Self {
        let mut node = HierarchyNode::new(EMPTY_NODE_ID.to_string(), String::new(), NodeLevel::Year, None);
        node.avg_pace = String::new();
        Hierarchy {
            nodes: vec![node],
            root: 0,
            layout,
        }
    }

    /// True for the sentinel tree built from no activities
    pub fn is_empty(&self) -> bool {
        self.nodes[self.root].id == EMPTY_NODE_ID
    }

    pub fn layout(&self) -> HierarchyLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> &HierarchyNode {
        &self.nodes[self.root]
    }

    pub fn get(&self, id: NodeId) -> Option<&HierarchyNode> {
        self.nodes.get(id)
    }

    /// Look a node up by its string id
    pub fn find(&self, id: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &HierarchyNode> + '_ {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |c| &self.nodes[*c])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    /// Ancestors from the nearest parent up to the root
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// Breadcrumb from the root down to `id`
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        if id >= self.nodes.len() {
            return Vec::new();
        }
        let mut path = self.ancestors(id);
        path.reverse();
        path.push(id);
        path
    }

    /// Every node, level by level, siblings in display order
    pub fn breadth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([self.root]);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            queue.extend(self.nodes[id].children.iter().copied());
        }
        order
    }

    /// Leaves below `id` in display order
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        if node.is_leaf() {
            return vec![id];
        }
        node.children.iter().flat_map(|c| self.leaves(*c)).collect()
    }

    /// Largest value in the subtree rooted at `id`
    pub fn max_value(&self, id: NodeId) -> Decimal {
        let Some(node) = self.nodes.get(id) else {
            return Decimal::ZERO;
        };
        node.children
            .iter()
            .map(|c| self.max_value(*c))
            .fold(node.value, Decimal::max)
    }

    /// Previous or next sibling, used to step between months
    pub fn sibling(&self, id: NodeId, direction: Direction) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = &self.nodes[parent].children;
        let idx = siblings.iter().position(|s| *s == id)?;
        match direction {
            Direction::Prev => idx.checked_sub(1).map(|i| siblings[i]),
            Direction::Next => siblings.get(idx + 1).copied(),
        }
    }

    /// All nodes of one level in display order
    pub fn level(&self, level: NodeLevel) -> Vec<NodeId> {
        self.breadth_first()
            .into_iter()
            .filter(|id| self.nodes[*id].level == level)
            .collect()
    }

    pub fn to_nested(&self) -> NestedNode {
        self.nested(self.root)
    }

    fn nested(&self, id: NodeId) -> NestedNode {
        let node = &self.nodes[id];
        NestedNode {
            id: node.id.clone(),
            name: node.name.clone(),
            level: node.level,
            value: node.value,
            count: node.count,
            avg_pace: node.avg_pace.clone(),
            avg_bpm: node.avg_bpm,
            order: node.order,
            children: node.children.iter().map(|c| self.nested(*c)).collect(),
        }
    }
}

impl Serialize for Hierarchy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_nested().serialize(serializer)
    }
}
