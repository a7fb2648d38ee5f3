use tracing::error;

use crate::ui::tui::Tui;

pub fn set_panic_hook() {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        error!(%panic_info, "panicked");
        let _ = Tui::restore();
        hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_chains_to_previous() {
        set_panic_hook();
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
    }
}
