//! User actions carried by injected controls.
//!
//! Controls are not given listeners of their own. They carry their action as
//! attributes and a single delegated listener dispatches them, so re-running
//! a pass over the same control can never stack handlers.

use crate::error::Result;
use crate::page::Page;
use crate::resolver::ListingId;

pub const ACTION_ATTR: &str = "data-znt-action";
pub const ID_ATTR: &str = "data-znt-id";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Open the edit modal for a listing.
    Edit(ListingId),
    /// Save the detail panel's text.
    SavePanel,
    /// Build the export of visible listings.
    Export,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Self::Edit(_) => "edit",
            Self::SavePanel => "save-panel",
            Self::Export => "export",
        }
    }

    /// Decodes the attributes of a clicked control.
    pub fn from_attributes(action: &str, id: Option<&str>) -> Option<Self> {
        match action {
            "edit" => id.and_then(ListingId::from_digits).map(Self::Edit),
            "save-panel" => Some(Self::SavePanel),
            "export" => Some(Self::Export),
            _ => None,
        }
    }

    pub fn read<P: Page>(page: &P, node: &P::Node) -> Option<Self> {
        let action = page.attribute(node, ACTION_ATTR)?;
        Self::from_attributes(&action, page.attribute(node, ID_ATTR).as_deref())
    }

    /// Attaches this action to `node`. Binding the same action again is a no-op.
    pub fn bind<P: Page>(&self, page: &P, node: &P::Node) -> Result<()> {
        page.update_attribute(node, ACTION_ATTR, self.name())?;
        if let Self::Edit(id) = self {
            page.update_attribute(node, ID_ATTR, id.as_str())?;
        }
        Ok(())
    }
}
