use std::ops::Range;

use parse_display::Display;

/// A value along with the byte range it was parsed from
#[derive(Clone, Debug, PartialEq, Eq, Display)]
#[display("{inner}", bound(T))]
pub struct Located<T> {
    pub inner: T,
    pub location: Range<usize>,
}

pub(crate) trait Locatable: Sized {
    fn with_location(self, location: Range<usize>) -> Located<Self> {
        Located {
            inner: self,
            location,
        }
    }
}

impl<T> Locatable for T {}
