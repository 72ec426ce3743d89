//! Built-in keyword sets for the query router
//!
//! Curated by hand. Matching lowercases the prompt, so English entries are
//! stored in lowercase.

/// Task-management terms
pub const TASK_KEYWORDS: &[&str] = &[
    "タスク",
    "task",
    "tasks",
    "プロジェクト",
    "project",
    "アサナ",
    "asana",
    "期限",
    "deadline",
    "due",
    "担当",
    "assignee",
    "assigned",
    "進捗",
    "progress",
    "status",
    "コメント",
    "comment",
    "完了",
    "complete",
    "done",
    "作成",
    "create",
    "new",
    "更新",
    "update",
    "modify",
];

/// Internal-document terms
pub const DOCUMENT_KEYWORDS: &[&str] = &[
    // Documents
    "文書",
    "ドキュメント",
    "資料",
    "書類",
    "文献",
    "マニュアル",
    "ガイド",
    "手順書",
    "説明書",
    "規程",
    "規則",
    "ポリシー",
    "方針",
    "仕様書",
    "設計書",
    "報告書",
    "レポート",
    "レコード",
    "リスト",
    // Company and organisation
    "社内",
    "会社",
    "組織",
    "部署",
    "チーム",
    "プロジェクト",
    "製品",
    "サービス",
    "システム",
    "ツール",
    "アプリケーション",
    // Question phrasing
    "について教えて",
    "について説明",
    "とは何",
    "どのような",
    "どうやって",
    "やり方",
    "使い方",
    "方法",
    "手順",
    // Lookup requests
    "最新の",
    "現在の",
    "今の",
    "確認したい",
    "調べたい",
    "知りたい",
    "探している",
    "検索",
    "参照",
];

/// Procedure and policy phrasing
pub const DOCUMENT_PATTERNS: &[&str] = &[
    r".*の(手順|方法|やり方|使い方)",
    r".*について(教えて|説明|知りたい)",
    r".*マニュアル|.*ガイド|.*ドキュメント",
    r".*規程|.*ポリシー|.*ルール",
];
