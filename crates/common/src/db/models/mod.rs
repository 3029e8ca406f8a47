//! SeaORM entity models
//!
//! Database entities for Pagemark

mod user;
mod pdf;
mod highlight;
mod drawing;
mod note;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use pdf::{
    Entity as PdfEntity,
    Model as Pdf,
    ActiveModel as PdfActiveModel,
    Column as PdfColumn,
};

pub use highlight::{
    Entity as HighlightEntity,
    Model as Highlight,
    ActiveModel as HighlightActiveModel,
    Column as HighlightColumn,
    DEFAULT_COLOR,
};

pub use drawing::{
    Entity as DrawingEntity,
    Model as Drawing,
    ActiveModel as DrawingActiveModel,
    Column as DrawingColumn,
};

pub use note::{
    Entity as NoteEntity,
    Model as Note,
    ActiveModel as NoteActiveModel,
    Column as NoteColumn,
};
