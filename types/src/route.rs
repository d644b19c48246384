use std::fmt;

/// Client-side pages the verification flows navigate between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
    Profile,
    Checkout,
    VerifyOtp,
    VerifyEmail,
}

impl Route {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Profile => "/profile",
            Route::Checkout => "/checkout",
            Route::VerifyOtp => "/verify-otp",
            Route::VerifyEmail => "/verify-email",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
