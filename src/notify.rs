/// Where user-facing errors go.
pub trait Notifier {
    fn alert(&self, message: &str);
}

/// Blocking `window.alert`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DialogNotifier;

impl Notifier for DialogNotifier {
    fn alert(&self, message: &str) {
        gloo::dialogs::alert(message);
    }
}
