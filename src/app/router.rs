#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Main,
    Login,
    Register,
    ActivityTable,
    Equipment,
    Upload,
}

/// Path table shared with the web front-end (hash routes).
pub const ROUTES: [(&str, Page); 6] = [
    ("/", Page::Main),
    ("/login", Page::Login),
    ("/register", Page::Register),
    ("/activitytable", Page::ActivityTable),
    ("/equipment", Page::Equipment),
    ("/upload", Page::Upload),
];

impl Page {
    pub fn from_path(path: &str) -> Option<Page> {
        let path = path.trim_start_matches('#');
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        ROUTES
            .iter()
            .find(|(route, _)| *route == path)
            .map(|(_, page)| *page)
    }

    pub fn path(self) -> &'static str {
        ROUTES
            .iter()
            .find(|(_, page)| *page == self)
            .map(|(route, _)| *route)
            .unwrap_or("/")
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::Main => "TF-Viewer",
            Page::Login => "Sign in",
            Page::Register => "Register",
            Page::ActivityTable => "Activities",
            Page::Equipment => "Equipment",
            Page::Upload => "Upload",
        }
    }

    /// Pages this client does not draw itself; they are opened in the browser.
    pub fn is_web_only(self) -> bool {
        matches!(
            self,
            Page::Login | Page::Register | Page::ActivityTable | Page::Equipment
        )
    }

    /// Address of this page in the web front-end.
    pub fn web_url(self, server_url: &str) -> String {
        format!("{}/#{}", server_url.trim_end_matches('/'), self.path())
    }
}

/// Server endpoint that ends the browser session.
pub fn logout_url(server_url: &str) -> String {
    format!("{}/logout", server_url.trim_end_matches('/'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Router {
    current: Page,
}

impl Default for Router {
    fn default() -> Self {
        Self {
            current: Page::Main,
        }
    }
}

impl Router {
    pub fn current(&self) -> Page {
        self.current
    }

    pub fn go(&mut self, page: Page) {
        if self.current != page {
            tracing::debug!("navigating to {}", page.path());
            self.current = page;
        }
    }

    /// Unknown paths land on the main page.
    pub fn navigate(&mut self, path: &str) {
        self.go(Page::from_path(path).unwrap_or(Page::Main));
    }
}
