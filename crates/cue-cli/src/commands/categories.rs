use anyhow::Result;

use crate::views::table::display_categories;

pub fn list_categories() -> Result<()> {
    display_categories();
    Ok(())
}
