/// An element that can be smoothly scrolled into view.
pub trait ScrollTarget {
    fn scroll_into_view_smooth(&self);
}

/// Looks elements up by id.
pub trait ElementLookup {
    type Target: ScrollTarget;

    fn find(&self, id: &str) -> Option<Self::Target>;
}

/// Normalizes a `data-target` value to an element id.
///
/// Both `section` and `#section` name the same element.
pub fn target_id(declared: &str) -> Option<&str> {
    let id = declared.trim();
    let id = id.strip_prefix('#').unwrap_or(id);
    (!id.is_empty()).then_some(id)
}

/// Scrolls to the element a navigation button points at.
///
/// Returns whether anything was scrolled.
pub fn scroll_to_target<D: ElementLookup>(document: &D, declared: Option<&str>) -> bool {
    let Some(id) = declared.and_then(target_id) else {
        return false;
    };
    match document.find(id) {
        Some(target) => {
            target.scroll_into_view_smooth();
            true
        }
        None => false,
    }
}
