/// UUID を包む ID 型を定義する
///
/// 生成されるもの:
///
/// - `Uuid` の Newtype（比較・ハッシュ・serde・`Display` 対応）
/// - `new()`（UUID v7 で採番）、`from_uuid()`、`as_uuid()`
///
/// 型ごとに別の ID として扱われるため、`InvoiceId` を `FirmId` の位置に
/// 渡すとコンパイルエラーになる。
///
/// ```rust
/// use invoiceflow_domain::{firm::FirmId, invoice::InvoiceId};
///
/// let invoice_id = InvoiceId::new();
/// assert_eq!(InvoiceId::from_uuid(*invoice_id.as_uuid()), invoice_id);
/// assert_eq!(invoice_id.to_string(), invoice_id.as_uuid().to_string());
/// # let _ = FirmId::new();
/// ```
macro_rules! define_uuid_id {
    ($(#[$attr:meta])* $vis:vis struct $Id:ident;) => {
        $(#[$attr])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            serde::Serialize,
            serde::Deserialize,
            derive_more::Display,
        )]
        #[serde(transparent)]
        #[display("{_0}")]
        $vis struct $Id(uuid::Uuid);

        impl $Id {
            /// UUID v7 で新しい ID を採番する
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            pub fn from_uuid(value: uuid::Uuid) -> Self {
                Self(value)
            }

            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $Id {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $Id {
            fn from(value: uuid::Uuid) -> Self {
                Self::from_uuid(value)
            }
        }
    };
}
