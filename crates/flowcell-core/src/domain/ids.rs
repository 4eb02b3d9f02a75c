//! Unit identifiers (strongly-typed IDs).
//!
//! Action と Flow はそれぞれ ULID ベースの ID を持ちます。
//! Phantom type パターンで `ActionId` と `FlowId` を別の型にしつつ、
//! 実装は `Id<T>` に一本化しています。
//!
//! ID はログ（tracing の span）とエラーレコードで「どの unit が失敗したか」を
//! 示すためだけに使われ、スケジューリング順序には関与しません。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"action-", "flow-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// `T` は PhantomData で、実行時にはメモリを消費しません。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionMarker {}

impl IdMarker for ActionMarker {
    fn prefix() -> &'static str {
        "action-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FlowMarker {}

impl IdMarker for FlowMarker {
    fn prefix() -> &'static str {
        "flow-"
    }
}

/// Identifier of a single state-transition unit.
pub type ActionId = Id<ActionMarker>;

/// Identifier of a multi-step flow.
pub type FlowId = Id<FlowMarker>;

/// The unit a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum UnitRef {
    Action(ActionId),
    Flow(FlowId),
}

impl fmt::Display for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitRef::Action(id) => id.fmt(f),
            UnitRef::Flow(id) => id.fmt(f),
        }
    }
}

impl From<ActionId> for UnitRef {
    fn from(id: ActionId) -> Self {
        UnitRef::Action(id)
    }
}

impl From<FlowId> for UnitRef {
    fn from(id: FlowId) -> Self {
        UnitRef::Flow(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let ulid1 = Ulid::new();
        let ulid2 = Ulid::new();

        let action = ActionId::from_ulid(ulid1);
        let flow = FlowId::from_ulid(ulid2);

        assert_eq!(action.as_ulid(), ulid1);
        assert_eq!(flow.as_ulid(), ulid2);

        assert!(action.to_string().starts_with("action-"));
        assert!(flow.to_string().starts_with("flow-"));
        // let _: ActionId = flow; // <- does not compile
    }

    #[test]
    fn unit_ref_displays_inner_id() {
        let id = ActionId::generate();
        assert_eq!(UnitRef::from(id).to_string(), id.to_string());

        let id = FlowId::generate();
        assert_eq!(UnitRef::from(id).to_string(), id.to_string());
    }

    #[test]
    fn unit_ref_serializes_with_kind_tag() {
        let unit = UnitRef::Flow(FlowId::generate());
        let json = serde_json::to_value(unit).unwrap();
        assert_eq!(json["kind"], "flow");

        let back: UnitRef = serde_json::from_value(json).unwrap();
        assert_eq!(back, unit);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<ActionId>(), size_of::<Ulid>());
        assert_eq!(size_of::<FlowId>(), size_of::<Ulid>());
    }
}
