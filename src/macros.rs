//! Declaration macros for user types.

/// The `Any` conversions and boxed cloning every [`Jsonable`](crate::Jsonable) impl needs.
#[doc(hidden)]
#[macro_export]
macro_rules! __any_plumbing {
    () => {
        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }

        fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
            self
        }

        fn clone_boxed(&self) -> ::std::boxed::Box<dyn $crate::Jsonable> {
            ::std::boxed::Box::new(::std::clone::Clone::clone(self))
        }
    };
}

/// Implements [`Jsonable`](crate::Jsonable), [`Materialize`](crate::Materialize) and
/// [`Coerce`](crate::Coerce) for a type that implements [`Described`](crate::Described).
///
/// The discriminator name defaults to the type's identifier: `described!(Point)` or
/// `described!(Point as "geo.Point")`.
#[macro_export]
macro_rules! described {
    (@impl $ty:ident, $name:expr) => {
        impl $crate::Jsonable for $ty {
            fn type_name(&self) -> &'static str {
                $name
            }

            fn kind(&self) -> $crate::Kind {
                $crate::Kind::Object
            }

            fn view(&self) -> $crate::View<'_> {
                $crate::View::Object
            }

            fn descriptor(&self) -> ::std::option::Option<::std::sync::Arc<$crate::TypeDescriptor>> {
                ::std::option::Option::Some($crate::registry::descriptor_of::<Self>())
            }

            $crate::__any_plumbing!();
        }

        impl $crate::Materialize for $ty {
            const NAME: &'static str = $name;

            fn materialize(
                mapping: &$crate::Object,
                cx: &$crate::Context<'_>,
            ) -> $crate::Result<Self> {
                let mut instance = <Self as ::std::default::Default>::default();
                $crate::materialize::fill(&mut instance, mapping, cx)?;
                ::std::result::Result::Ok(instance)
            }
        }

        impl $crate::Coerce for $ty {
            fn coerce(raw: &$crate::Value, cx: &$crate::Context<'_>) -> $crate::Result<Self> {
                $crate::materialize::coerce_object::<Self>(raw, cx)
            }
        }
    };
    ($ty:ident as $name:literal) => {
        $crate::described!(@impl $ty, $name);
    };
    ($ty:ident) => {
        $crate::described!(@impl $ty, stringify!($ty));
    };
}

/// Implements the traits for a fieldless enum written by the names of its constants.
///
/// ```
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Mode {
///     M1,
///     M2,
/// }
///
/// jsonable::constants!(Mode { M1, M2 });
///
/// assert_eq!(jsonable::to_string(&Mode::M1, &Default::default()).unwrap(), r#""M1""#);
/// ```
#[macro_export]
macro_rules! constants {
    (@impl $ty:ident, $name:expr, { $($variant:ident),* $(,)? }) => {
        impl $crate::Constant for $ty {
            fn constant_name(&self) -> &'static str {
                match self {
                    $($ty::$variant => stringify!($variant),)*
                }
            }

            fn from_constant(name: &str) -> ::std::option::Option<Self> {
                match name {
                    $(stringify!($variant) => ::std::option::Option::Some($ty::$variant),)*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl $crate::Jsonable for $ty {
            fn type_name(&self) -> &'static str {
                $name
            }

            fn kind(&self) -> $crate::Kind {
                $crate::Kind::Enum
            }

            fn view(&self) -> $crate::View<'_> {
                $crate::View::Enum($crate::Constant::constant_name(self))
            }

            $crate::__any_plumbing!();
        }

        impl $crate::Materialize for $ty {
            const NAME: &'static str = $name;

            fn materialize(
                mapping: &$crate::Object,
                _cx: &$crate::Context<'_>,
            ) -> $crate::Result<Self> {
                $crate::coerce::constant_from_mapping::<Self>(mapping)
            }
        }

        impl $crate::Coerce for $ty {
            fn coerce(raw: &$crate::Value, cx: &$crate::Context<'_>) -> $crate::Result<Self> {
                $crate::coerce::coerce_constant::<Self>(raw, cx)
            }
        }
    };
    ($ty:ident as $name:literal { $($variant:ident),* $(,)? }) => {
        $crate::constants!(@impl $ty, $name, { $($variant),* });
    };
    ($ty:ident { $($variant:ident),* $(,)? }) => {
        $crate::constants!(@impl $ty, stringify!($ty), { $($variant),* });
    };
}

/// Implements the traits for a plain struct written member by member, without a schema.
/// Every listed field must implement [`Jsonable`](crate::Jsonable) and
/// [`Coerce`](crate::Coerce); the struct must implement `Default`, `Clone` and `Debug`.
#[macro_export]
macro_rules! object {
    (@impl $ty:ident, $name:expr, { $($field:ident),* $(,)? }) => {
        impl $crate::Jsonable for $ty {
            fn type_name(&self) -> &'static str {
                $name
            }

            fn kind(&self) -> $crate::Kind {
                $crate::Kind::Object
            }

            fn view(&self) -> $crate::View<'_> {
                $crate::View::Object
            }

            fn fields(&self) -> ::std::vec::Vec<(&'static str, &dyn $crate::Jsonable)> {
                ::std::vec![$((stringify!($field), &self.$field as &dyn $crate::Jsonable)),*]
            }

            #[allow(unused_variables)]
            fn fill_members(
                &mut self,
                mapping: &$crate::Object,
                cx: &$crate::Context<'_>,
            ) -> $crate::Result<()> {
                $(
                    if let ::std::option::Option::Some(raw) = mapping
                        .get(stringify!($field))
                        .filter(|raw| !raw.is_null())
                    {
                        self.$field = $crate::Coerce::coerce(raw, cx)
                            .map_err(|e: $crate::Error| e.at(stringify!($field)))?;
                    }
                )*
                ::std::result::Result::Ok(())
            }

            $crate::__any_plumbing!();
        }

        impl $crate::Materialize for $ty {
            const NAME: &'static str = $name;

            fn materialize(
                mapping: &$crate::Object,
                cx: &$crate::Context<'_>,
            ) -> $crate::Result<Self> {
                let mut instance = <Self as ::std::default::Default>::default();
                $crate::materialize::fill(&mut instance, mapping, cx)?;
                ::std::result::Result::Ok(instance)
            }
        }

        impl $crate::Coerce for $ty {
            fn coerce(raw: &$crate::Value, cx: &$crate::Context<'_>) -> $crate::Result<Self> {
                $crate::materialize::coerce_object::<Self>(raw, cx)
            }
        }
    };
    ($ty:ident as $name:literal { $($field:ident),* $(,)? }) => {
        $crate::object!(@impl $ty, $name, { $($field),* });
    };
    ($ty:ident { $($field:ident),* $(,)? }) => {
        $crate::object!(@impl $ty, stringify!($ty), { $($field),* });
    };
}
