/// Generates a sequential little-endian read method for one primitive type.
macro_rules! impl_read_le {
    ($type:ty, $size:literal) => {
        paste::paste! {
            #[doc = "Reads a little-endian `" $type "` and advances the cursor."]
            #[doc = ""]
            #[doc = "# Panics"]
            #[doc = "Panics if fewer than " $size " bytes remain."]
            #[inline]
            pub fn [<read_ $type>](&mut self) -> $type {
                let bytes = self.take($size);
                <$type>::from_le_bytes(bytes.try_into().unwrap())
            }
        }
    };
}

/// Generates read methods for all fixed-width primitives.
macro_rules! impl_read_all {
    () => {
        impl_read_le!(u8, 1);
        impl_read_le!(i8, 1);
        impl_read_le!(u16, 2);
        impl_read_le!(i16, 2);
        impl_read_le!(u32, 4);
        impl_read_le!(i32, 4);
        impl_read_le!(u64, 8);
        impl_read_le!(i64, 8);
        impl_read_le!(f32, 4);
        impl_read_le!(f64, 8);
    };
}

/// Generates a sequential little-endian write method for one primitive type.
macro_rules! impl_write_le {
    ($type:ty, $size:literal) => {
        paste::paste! {
            #[doc = "Writes a little-endian `" $type "` and advances the cursor."]
            #[doc = ""]
            #[doc = "# Panics"]
            #[doc = "Panics if fewer than " $size " bytes remain."]
            #[inline]
            pub fn [<write_ $type>](&mut self, value: $type) {
                self.put(&value.to_le_bytes());
            }
        }
    };
}

/// Generates write methods for all fixed-width primitives.
macro_rules! impl_write_all {
    () => {
        impl_write_le!(u8, 1);
        impl_write_le!(i8, 1);
        impl_write_le!(u16, 2);
        impl_write_le!(i16, 2);
        impl_write_le!(u32, 4);
        impl_write_le!(i32, 4);
        impl_write_le!(u64, 8);
        impl_write_le!(i64, 8);
        impl_write_le!(f32, 4);
        impl_write_le!(f64, 8);
    };
}

/// Generates cursor bookkeeping shared by reader and writer.
macro_rules! impl_cursor_common {
    () => {
        /// Total length of the underlying buffer.
        #[inline]
        pub fn len(&self) -> usize {
            self.buf.len()
        }

        /// Returns true if the underlying buffer is empty.
        #[inline]
        pub fn is_empty(&self) -> bool {
            self.buf.is_empty()
        }

        /// Current cursor position.
        #[inline]
        pub fn position(&self) -> usize {
            self.pos
        }

        /// Bytes left after the cursor.
        #[inline]
        pub fn remaining(&self) -> usize {
            self.buf.len() - self.pos
        }
    };
}

pub(super) use impl_cursor_common;
pub(super) use impl_read_all;
pub(super) use impl_read_le;
pub(super) use impl_write_all;
pub(super) use impl_write_le;
