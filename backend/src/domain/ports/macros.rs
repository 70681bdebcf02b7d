//! Helper macro for declaring port error enums.
//!
//! Every variant gets a snake-case constructor accepting `impl Into<T>` for
//! each field and an `is_<variant>` predicate.

macro_rules! define_port_error {
    (@methods $variant:ident) => {
        ::paste::paste! {
            #[doc = concat!("Construct the `", stringify!($variant), "` variant.")]
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }

            #[doc = concat!("Whether this is the `", stringify!($variant), "` variant.")]
            #[must_use]
            pub fn [<is_ $variant:snake>](&self) -> bool {
                matches!(self, Self::$variant)
            }
        }
    };

    (@methods $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        ::paste::paste! {
            #[doc = concat!("Construct the `", stringify!($variant), "` variant.")]
            pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                Self::$variant { $($field: $field.into()),* }
            }

            #[doc = concat!("Whether this is the `", stringify!($variant), "` variant.")]
            #[must_use]
            pub fn [<is_ $variant:snake>](&self) -> bool {
                matches!(self, Self::$variant { .. })
            }
        }
    };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@methods $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    define_port_error! {
        pub enum ProbeError {
            Stalled => "probe stalled",
            Refused { message: String } => "refused: {message}",
            Slow { message: String, millis: u64 } => "slow: {message} after {millis}ms",
        }
    }

    #[test]
    fn unit_variant_constructor_and_predicate() {
        let err = ProbeError::stalled();
        assert!(err.is_stalled());
        assert!(!err.is_refused());
        assert_eq!(err.to_string(), "probe stalled");
    }

    #[test]
    fn string_fields_accept_str() {
        let err = ProbeError::refused("node-1");
        assert!(err.is_refused());
        assert_eq!(err.to_string(), "refused: node-1");
    }

    #[test]
    fn mixed_fields_keep_their_types() {
        let err = ProbeError::slow("node-2", 2_000_u64);
        assert!(err.is_slow());
        assert_eq!(err.to_string(), "slow: node-2 after 2000ms");
    }
}
