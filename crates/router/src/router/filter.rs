//! Method filters deciding which of the routes sharing a path applies.

use crate::Request;
use http::Method;

/// A filter that matches HTTP methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodFilter(Method);

impl MethodFilter {
    pub fn new(method: Method) -> Self {
        Self(method)
    }

    pub fn method(&self) -> &Method {
        &self.0
    }

    /// Check if the request was sent with this filter's method.
    pub fn matches(&self, req: &Request<'_, '_>) -> bool {
        self.0.eq(req.method())
    }
}

macro_rules! method_filter {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Creates a filter that matches HTTP ", stringify!($upper_case_method), " requests.")]
        #[inline]
        pub fn $method() -> MethodFilter {
            MethodFilter(Method::$upper_case_method)
        }
    };
}

method_filter!(get_method, GET);
method_filter!(post_method, POST);
method_filter!(put_method, PUT);
method_filter!(delete_method, DELETE);
method_filter!(head_method, HEAD);
method_filter!(options_method, OPTIONS);
method_filter!(patch_method, PATCH);

#[cfg(test)]
mod tests {
    use super::{MethodFilter, get_method, post_method};
    use crate::{PathParams, Request};
    use http::Method;

    #[test]
    fn test_method_filter() {
        let parts = http::Request::builder().method(Method::POST).body(()).unwrap().into_parts().0;
        let params = PathParams::empty();
        let req = Request::new(&parts, &params);

        assert!(post_method().matches(&req));
        assert!(!get_method().matches(&req));
        assert!(MethodFilter::new(Method::POST).matches(&req));
        assert_eq!(post_method().method(), Method::POST);
    }
}
