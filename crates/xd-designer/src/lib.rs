pub mod hit;
pub mod layout;
pub mod placement;
pub mod session;
pub mod settings;
pub mod snapline;
pub mod undo;
pub mod view;

pub use hit::{container_at, hit_test, hit_test_rect};
pub use layout::{GridTracks, LayoutView, Viewport, resolve_layout};
pub use placement::{
    BehaviorRegistry, PlacementAlignment, PlacementBehavior, PlacementContext, PlacementError, PlacementOperation,
    PlacementType, can_resize, delete_items,
};
pub use session::{DesignSession, SessionError};
pub use settings::DesignerSettings;
pub use snapline::{Snapline, SnaplineMap};
pub use undo::{UndoError, UndoService};
pub use view::ViewProvider;
