//! Entity Component System core types.
//!
//! Component types are single bits of a 64-bit [`ComponentMask`] with a
//! fixed byte stride. Entities carry a mask and own one fixed-stride slot per
//! set bit. Systems are callbacks gated by a [`ComponentQuery`], run once per
//! frame in ascending execution order, optionally split across worker
//! threads. Structural work requested mid-frame goes through the
//! [`TaskQueue`] and is applied after the last system.

mod component;
mod context;
mod entity;
mod error;
mod query;
mod scheduler;
pub mod storage;
mod system;
mod system_descriptor;
mod system_handle;
mod system_registry;
mod task;
mod world;

pub use component::{ComponentMask, ComponentRegistry, ComponentType};
pub use context::Ecs;
pub use entity::Entity;
pub use error::EcsError;
pub use query::{ComponentQuery, QueryComparison};
pub use scheduler::partition;
pub use storage::ComponentPtr;
pub use system::{SystemContext, SystemFn};
pub use system_descriptor::SystemDescriptor;
pub use system_handle::SystemHandle;
pub use task::{Task, TaskQueue};
pub use world::World;
