//! Procurement domain: purchase orders, supplier scoring and the external
//! demand feed.
//!
//! Pure decision logic (supplier selection, order quantity policy, rating
//! math); the engine crate owns orchestration and atomicity.

pub mod demand;
pub mod order;
pub mod rating;

pub use demand::{PredictedDemand, pick_order_quantity};
pub use order::{OrderStatus, PurchaseOrder, auto_order_number, select_supplier};
pub use rating::{RatingScores, SupplierRating, mean_overall, on_time_rate};
