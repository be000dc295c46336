use std::fmt;

/// Navigable pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    About,
    Login,
    Signup,
    Dashboard,
    Screener,
    Results,
    Forum,
    Post(i64),
    Resources,
    Library,
    SensoryGym,
    MagicCanvas,
    EmotionMirror,
    MagicDrums,
}

impl Route {
    pub fn path(&self) -> String {
        let path = match self {
            Route::Home => "/",
            Route::About => "/about",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Dashboard => "/dashboard",
            Route::Screener => "/screener",
            Route::Results => "/screener/results",
            Route::Forum => "/forum",
            Route::Post(id) => return format!("/forum/{id}"),
            Route::Resources => "/resources",
            Route::Library => "/resources/library",
            Route::SensoryGym => "/gym",
            Route::MagicCanvas => "/gym/magic-canvas",
            Route::EmotionMirror => "/gym/emotion-mirror",
            Route::MagicDrums => "/gym/magic-drums",
        };
        path.to_string()
    }

    /// Resolve a path; trailing slashes and query strings are ignored
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let route = match segments.as_slice() {
            [] => Route::Home,
            ["about"] => Route::About,
            ["login"] => Route::Login,
            ["signup"] => Route::Signup,
            ["dashboard"] => Route::Dashboard,
            ["screener"] => Route::Screener,
            ["screener", "results"] => Route::Results,
            ["forum"] => Route::Forum,
            ["forum", id] => Route::Post(id.parse().ok()?),
            ["resources"] => Route::Resources,
            ["resources", "library"] => Route::Library,
            ["gym"] => Route::SensoryGym,
            ["gym", "magic-canvas"] => Route::MagicCanvas,
            ["gym", "emotion-mirror"] => Route::EmotionMirror,
            ["gym", "magic-drums"] => Route::MagicDrums,
            _ => return None,
        };
        Some(route)
    }

    /// Pages that need a signed-in session
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Route::Dashboard
                | Route::Forum
                | Route::Post(_)
                | Route::Resources
                | Route::Library
                | Route::SensoryGym
                | Route::MagicCanvas
                | Route::EmotionMirror
                | Route::MagicDrums
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
