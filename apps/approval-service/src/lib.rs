//! # InvoiceFlow 承認サービス
//!
//! 請求書の多段承認ワークフローを提供する内部 API サービス。
//!
//! ## 構成
//!
//! - [`handler`] - HTTP ハンドラ（薄いアダプタ）
//! - [`usecase`] - 承認依頼・承認/却下・照会のユースケース
//! - [`error`] - サービスエラーと HTTP レスポンスへの変換
//! - [`config`] - 環境変数からの設定読み込み
//! - [`app_builder`] - ルーターとミドルウェアの構築

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;
