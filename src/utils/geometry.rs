use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Sub};

/// Type-level marker for the logical coordinate space
///
/// This is the global compositor space windows, outputs and the pointer live in.
#[derive(Debug)]
pub struct Logical;

/// Numeric type usable as a coordinate of the geometry types
pub trait Coordinate:
    Sized + Add<Self, Output = Self> + Sub<Self, Output = Self> + PartialOrd + Default + Copy + fmt::Debug
{
    /// A Coordinate that is 0
    const ZERO: Self;
    /// Convert the coordinate to a f64
    fn to_f64(self) -> f64;
    /// Convert to this coordinate from a f64
    fn from_f64(v: f64) -> Self;
    /// Test if the coordinate is not negative
    fn non_negative(self) -> bool;
    /// Addition saturating at the numeric bounds
    fn saturating_add(self, other: Self) -> Self;
    /// Subtraction saturating at the numeric bounds
    fn saturating_sub(self, other: Self) -> Self;
}

impl Coordinate for i32 {
    const ZERO: i32 = 0;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as i32
    }

    #[inline]
    fn non_negative(self) -> bool {
        self >= 0
    }

    #[inline]
    fn saturating_add(self, other: Self) -> Self {
        i32::saturating_add(self, other)
    }

    #[inline]
    fn saturating_sub(self, other: Self) -> Self {
        i32::saturating_sub(self, other)
    }
}

impl Coordinate for f64 {
    const ZERO: f64 = 0.0;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline]
    fn non_negative(self) -> bool {
        self >= 0.0
    }

    #[inline]
    fn saturating_add(self, other: Self) -> Self {
        self + other
    }

    #[inline]
    fn saturating_sub(self, other: Self) -> Self {
        self - other
    }
}

// The coordinate space is a marker only, none of these may require it to
// implement the trait itself.
macro_rules! marker_agnostic_impls {
    ($ty:ident { $($field:ident),+ } $(, $marker:ident)?) => {
        impl<N: Clone, Kind> Clone for $ty<N, Kind> {
            #[inline]
            fn clone(&self) -> Self {
                $ty {
                    $($field: self.$field.clone(),)+
                    $($marker: PhantomData,)?
                }
            }
        }

        impl<N: Copy, Kind> Copy for $ty<N, Kind> {}

        impl<N: PartialEq, Kind> PartialEq for $ty<N, Kind> {
            #[inline]
            fn eq(&self, other: &Self) -> bool {
                true $(&& self.$field == other.$field)+
            }
        }

        impl<N: Eq, Kind> Eq for $ty<N, Kind> {}
    };
}

/// A point as defined by its x and y coordinates
///
/// Additions and subtractions saturate.
#[repr(C)]
pub struct Point<N, Kind> {
    /// horizontal coordinate
    pub x: N,
    /// vertical coordinate
    pub y: N,
    _kind: PhantomData<Kind>,
}

impl<N: Default, Kind> Default for Point<N, Kind> {
    #[inline]
    fn default() -> Self {
        Point {
            x: N::default(),
            y: N::default(),
            _kind: PhantomData,
        }
    }
}

marker_agnostic_impls!(Point { x, y }, _kind);

impl<N: Coordinate, Kind> Point<N, Kind> {
    /// Convert the underlying numerical type to f64 for floating point manipulations
    #[inline]
    pub fn to_f64(self) -> Point<f64, Kind> {
        (self.x.to_f64(), self.y.to_f64()).into()
    }
}

impl<Kind> Point<f64, Kind> {
    /// Convert to an integer point by rounding each coordinate
    #[inline]
    pub fn to_i32_round<N: Coordinate>(self) -> Point<N, Kind> {
        (N::from_f64(self.x.round()), N::from_f64(self.y.round())).into()
    }
}

impl<N: fmt::Debug, Kind> fmt::Debug for Point<N, Kind> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point<{}>", std::any::type_name::<Kind>())?;
        f.debug_struct("").field("x", &self.x).field("y", &self.y).finish()
    }
}

impl<N, Kind> From<(N, N)> for Point<N, Kind> {
    #[inline]
    fn from((x, y): (N, N)) -> Point<N, Kind> {
        Point {
            x,
            y,
            _kind: PhantomData,
        }
    }
}

impl<N, Kind> From<Point<N, Kind>> for (N, N) {
    #[inline]
    fn from(point: Point<N, Kind>) -> (N, N) {
        (point.x, point.y)
    }
}

impl<N: Coordinate, Kind> Add for Point<N, Kind> {
    type Output = Point<N, Kind>;
    #[inline]
    fn add(self, other: Point<N, Kind>) -> Point<N, Kind> {
        (self.x.saturating_add(other.x), self.y.saturating_add(other.y)).into()
    }
}

impl<N: Coordinate, Kind> Sub for Point<N, Kind> {
    type Output = Point<N, Kind>;
    #[inline]
    fn sub(self, other: Point<N, Kind>) -> Point<N, Kind> {
        (self.x.saturating_sub(other.x), self.y.saturating_sub(other.y)).into()
    }
}

impl<N: Coordinate, Kind> Add<Size<N, Kind>> for Point<N, Kind> {
    type Output = Point<N, Kind>;
    #[inline]
    fn add(self, other: Size<N, Kind>) -> Point<N, Kind> {
        (self.x.saturating_add(other.w), self.y.saturating_add(other.h)).into()
    }
}

/// A size as defined by its width and height
///
/// Building a size from a tuple checks it is not negative with a `debug_assert!()`.
/// Writing the fields directly bypasses the check.
#[repr(C)]
pub struct Size<N, Kind> {
    /// width
    pub w: N,
    /// height
    pub h: N,
    _kind: PhantomData<Kind>,
}

impl<N: Default, Kind> Default for Size<N, Kind> {
    #[inline]
    fn default() -> Self {
        Size {
            w: N::default(),
            h: N::default(),
            _kind: PhantomData,
        }
    }
}

marker_agnostic_impls!(Size { w, h }, _kind);

impl<N: Coordinate, Kind> Size<N, Kind> {
    /// Whether the width or the height is zero
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w <= N::ZERO || self.h <= N::ZERO
    }
}

impl<N: fmt::Debug, Kind> fmt::Debug for Size<N, Kind> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Size<{}>", std::any::type_name::<Kind>())?;
        f.debug_struct("").field("w", &self.w).field("h", &self.h).finish()
    }
}

impl<N: Coordinate, Kind> From<(N, N)> for Size<N, Kind> {
    #[inline]
    fn from((w, h): (N, N)) -> Size<N, Kind> {
        debug_assert!(
            w.non_negative() && h.non_negative(),
            "Attempting to create a `Size` of negative size: {:?}",
            (w, h)
        );
        Size {
            w,
            h,
            _kind: PhantomData,
        }
    }
}

/// A rectangle defined by its top-left corner and dimensions
#[repr(C)]
pub struct Rectangle<N, Kind> {
    /// Location of the top-left corner of the rectangle
    pub loc: Point<N, Kind>,
    /// Size of the rectangle, as (width, height)
    pub size: Size<N, Kind>,
}

impl<N: Default, Kind> Default for Rectangle<N, Kind> {
    #[inline]
    fn default() -> Self {
        Rectangle {
            loc: Point::default(),
            size: Size::default(),
        }
    }
}

marker_agnostic_impls!(Rectangle { loc, size });

impl<N: Coordinate, Kind> Rectangle<N, Kind> {
    /// Create a new [`Rectangle`] from the coordinates of its top-left corner and its dimensions
    #[inline]
    pub fn from_loc_and_size(loc: impl Into<Point<N, Kind>>, size: impl Into<Size<N, Kind>>) -> Self {
        Rectangle {
            loc: loc.into(),
            size: size.into(),
        }
    }

    /// Create a new [`Rectangle`] with location and size zero
    #[inline]
    pub fn zero() -> Self {
        Rectangle::default()
    }

    /// Whether the width or the height is zero
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// Bottom-right corner, outside of the rectangle
    #[inline]
    fn end(&self) -> Point<N, Kind> {
        self.loc + self.size
    }

    /// Whether the point lies inside the rectangle
    ///
    /// The top and left edges are inside, the bottom and right ones are not.
    #[inline]
    pub fn contains(self, point: impl Into<Point<N, Kind>>) -> bool {
        let point = point.into();
        let end = self.end();
        point.x >= self.loc.x && point.x < end.x && point.y >= self.loc.y && point.y < end.y
    }

    /// The overlapping area of two rectangles
    ///
    /// Returns `None` if they don't overlap.
    pub fn intersection(self, other: impl Into<Rectangle<N, Kind>>) -> Option<Self> {
        let other = other.into();
        let larger = |a: N, b: N| if a > b { a } else { b };
        let smaller = |a: N, b: N| if a < b { a } else { b };

        let (end, other_end) = (self.end(), other.end());
        let start: Point<N, Kind> = (larger(self.loc.x, other.loc.x), larger(self.loc.y, other.loc.y)).into();
        let end: Point<N, Kind> = (smaller(end.x, other_end.x), smaller(end.y, other_end.y)).into();
        if end.x <= start.x || end.y <= start.y {
            return None;
        }
        Some(Rectangle::from_loc_and_size(start, (end.x - start.x, end.y - start.y)))
    }
}

impl<N: fmt::Debug, Kind> fmt::Debug for Rectangle<N, Kind> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rectangle<{}>", std::any::type_name::<Kind>())?;
        f.debug_struct("")
            .field("x", &self.loc.x)
            .field("y", &self.loc.y)
            .field("width", &self.size.w)
            .field("height", &self.size.h)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Logical, Point, Rectangle, Size};

    #[test]
    fn rectangle_contains_is_half_open() {
        let rect = Rectangle::<i32, Logical>::from_loc_and_size((10, 20), (30, 40));
        assert!(rect.contains((10, 20)));
        assert!(rect.contains((39, 59)));
        assert!(!rect.contains((40, 20)));
        assert!(!rect.contains((10, 60)));
    }

    #[test]
    fn rectangle_intersection() {
        let a = Rectangle::<i32, Logical>::from_loc_and_size((0, 0), (100, 100));
        let b = Rectangle::<i32, Logical>::from_loc_and_size((50, 60), (100, 100));
        assert_eq!(
            a.intersection(b),
            Some(Rectangle::from_loc_and_size((50, 60), (50, 40)))
        );

        let c = Rectangle::<i32, Logical>::from_loc_and_size((100, 0), (10, 10));
        assert_eq!(a.intersection(c), None);
    }

    #[test]
    fn empty_rectangle() {
        assert!(Rectangle::<i32, Logical>::zero().is_empty());
        assert!(Rectangle::<i32, Logical>::from_loc_and_size((5, 5), (0, 10)).is_empty());
        assert!(!Rectangle::<i32, Logical>::from_loc_and_size((5, 5), (1, 1)).is_empty());
    }

    #[test]
    fn point_arithmetic() {
        let point = Point::<f64, Logical>::from((10.4, -3.6));
        assert_eq!(point.to_i32_round::<i32>(), Point::from((10, -4)));

        let loc = Point::<i32, Logical>::from((i32::MAX - 1, 5));
        assert_eq!(loc + Size::from((10, 10)), Point::from((i32::MAX, 15)));
        assert_eq!(loc - Point::from((0, 10)), Point::from((i32::MAX - 1, -5)));
        assert_eq!(loc.to_f64(), Point::from(((i32::MAX - 1) as f64, 5.0)));
    }
}
