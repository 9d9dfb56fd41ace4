use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clients::FeedbackView;
use crate::domain::order::{transitions, Order, OrderId, OrderStatus, OwnerId, ServiceId, TransitionAction};

pub const ORDERS_PATH: &str = "/orders";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

impl Link {
    fn new(rel: &str, href: String) -> Self {
        Self {
            rel: rel.to_string(),
            href,
        }
    }
}

/// Outward representation of an order: no version, optional feedback,
/// and links for the actions its current status allows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub owner_id: OwnerId,
    pub status: OrderStatus,
    pub service_id: ServiceId,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    pub feedback: Option<FeedbackView>,
    pub links: Vec<Link>,
}

impl OrderView {
    pub fn new(order: Order, feedback: Option<FeedbackView>) -> Self {
        let links = links_for(order.id, order.status);
        Self {
            id: order.id,
            owner_id: order.owner_id,
            status: order.status,
            service_id: order.service_id,
            comment: order.comment,
            created_at: order.created_at,
            last_modified_at: order.last_modified_at,
            feedback,
            links,
        }
    }

    #[cfg(test)]
    pub fn link(&self, rel: &str) -> Option<&Link> {
        self.links.iter().find(|link| link.rel == rel)
    }
}

/// `self` plus one link per transition the status allows
pub fn links_for(id: OrderId, status: OrderStatus) -> Vec<Link> {
    let href = format!("{ORDERS_PATH}/{id}");
    let mut links = vec![Link::new("self", href.clone())];
    links.extend(
        transitions::allowed_targets(status)
            .iter()
            .filter_map(|target| TransitionAction::for_target(*target))
            .map(|action| Link::new(action.rel(), format!("{href}/{}", action.rel()))),
    );
    links
}
