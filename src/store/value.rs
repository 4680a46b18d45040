//! Polymorphic store values.
//!
//! The store owns its values as `Box<dyn Value>`. Concrete value types come
//! from the caller's schema; the store only needs to name them, compare them
//! and hand them to a [`Visitor`] for export.

use std::any::Any;
use std::fmt;

/// A value owned by a [`Store`](crate::Store).
pub trait Value: Any + fmt::Debug {
    /// Name of the concrete value type, for errors and dumps.
    fn type_name(&self) -> &'static str;

    /// Structural equality across value types. Values of different concrete
    /// types are never equal.
    fn eq_value(&self, other: &dyn Value) -> bool;

    /// Feed the value's contents to `visitor`.
    fn visit(&self, visitor: &mut dyn Visitor);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Receives the primitive parts of a [`Value`].
///
/// Composite values call several methods in turn; `begin`/`end` bracket a
/// nested group.
pub trait Visitor {
    fn visit_bool(&mut self, value: bool);
    fn visit_u64(&mut self, value: u64);
    fn visit_i64(&mut self, value: i64);
    fn visit_f64(&mut self, value: f64);
    fn visit_str(&mut self, value: &str);
    fn visit_bytes(&mut self, value: &[u8]);

    fn begin(&mut self, _name: &str) {}
    fn end(&mut self) {}
}

impl PartialEq for dyn Value {
    fn eq(&self, other: &Self) -> bool {
        self.eq_value(other)
    }
}

impl<'a> dyn Value + 'a {
    pub fn is<T: Value>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Value>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: Value>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

macro_rules! impl_value {
    ($($ty:ty => |$v:ident, $visitor:ident| $body:expr;)*) => {
        $(
            impl Value for $ty {
                fn type_name(&self) -> &'static str {
                    std::any::type_name::<Self>()
                }

                fn eq_value(&self, other: &dyn Value) -> bool {
                    other.as_any().downcast_ref::<Self>() == Some(self)
                }

                fn visit(&self, $visitor: &mut dyn Visitor) {
                    let $v = self;
                    $body
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn Any {
                    self
                }
            }
        )*
    };
}

impl_value! {
    bool => |v, visitor| visitor.visit_bool(*v);
    u8 => |v, visitor| visitor.visit_u64(u64::from(*v));
    u16 => |v, visitor| visitor.visit_u64(u64::from(*v));
    u32 => |v, visitor| visitor.visit_u64(u64::from(*v));
    u64 => |v, visitor| visitor.visit_u64(*v);
    i32 => |v, visitor| visitor.visit_i64(i64::from(*v));
    i64 => |v, visitor| visitor.visit_i64(*v);
    f64 => |v, visitor| visitor.visit_f64(*v);
    String => |v, visitor| visitor.visit_str(v);
    Vec<u8> => |v, visitor| visitor.visit_bytes(v);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect(Vec<String>);

    impl Visitor for Collect {
        fn visit_bool(&mut self, value: bool) {
            self.0.push(format!("bool:{value}"));
        }
        fn visit_u64(&mut self, value: u64) {
            self.0.push(format!("u64:{value}"));
        }
        fn visit_i64(&mut self, value: i64) {
            self.0.push(format!("i64:{value}"));
        }
        fn visit_f64(&mut self, value: f64) {
            self.0.push(format!("f64:{value}"));
        }
        fn visit_str(&mut self, value: &str) {
            self.0.push(format!("str:{value}"));
        }
        fn visit_bytes(&mut self, value: &[u8]) {
            self.0.push(format!("bytes:{}", value.len()));
        }
    }

    #[test]
    fn test_eq_value_requires_same_type() {
        let a: Box<dyn Value> = Box::new(7u32);
        let b: Box<dyn Value> = Box::new(7u32);
        let c: Box<dyn Value> = Box::new(7u64);
        assert!(*a == *b);
        assert!(*a != *c);
        assert_eq!(c.type_name(), "u64");
    }

    #[test]
    fn test_downcast() {
        let mut v: Box<dyn Value> = Box::new(String::from("x"));
        assert!(v.is::<String>());
        assert!(v.downcast_ref::<u64>().is_none());
        v.downcast_mut::<String>().unwrap().push('y');
        assert_eq!(v.downcast_ref::<String>().unwrap(), "xy");
    }

    #[test]
    fn test_visit_primitives() {
        let mut out = Collect::default();
        for v in [
            Box::new(true) as Box<dyn Value>,
            Box::new(-3i32),
            Box::new(9u16),
            Box::new(String::from("hi")),
            Box::new(vec![1u8, 2, 3]),
        ] {
            v.visit(&mut out);
        }
        assert_eq!(out.0, ["bool:true", "i64:-3", "u64:9", "str:hi", "bytes:3"]);
    }
}
