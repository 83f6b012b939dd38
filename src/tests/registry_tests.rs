//! tests/registry_tests.rs
//! Pruebas unitarias para `RowRegistry`.

#[cfg(test)]
mod tests {
    use crate::models::record_model::{ChainState, Record, RenderAction};
    use crate::services::row_registry::{escape_html, RowRegistry};

    #[tokio::test]
    async fn test_first_render_appends_then_updates_in_place() {
        let registry = RowRegistry::new();

        let first = Record::test_new("abc", "Лор", "PENDING");
        assert_eq!(registry.render("abc", &first).await, RenderAction::Inserted);

        let second = Record::test_new("abc", "Лор", "Запись...");
        assert_eq!(registry.render("abc", &second).await, RenderAction::Updated);

        assert_eq!(registry.len().await, 1);
        let row = registry.get("abc").await.expect("fila");
        assert_eq!(row.record_status, "Запись...");
        assert_eq!(row.polls, 2);
        assert_eq!(row.chain, ChainState::Polling);
    }

    #[tokio::test]
    async fn test_rows_keep_insertion_order() {
        let registry = RowRegistry::new();
        for id in ["3", "1", "2"] {
            registry
                .render(id, &Record::test_new(id, "Хирург", "PENDING"))
                .await;
        }
        // Actualizar la primera no la mueve
        registry
            .render("3", &Record::test_new("3", "Хирург", "Успешно"))
            .await;

        let ids: Vec<String> = registry
            .rows()
            .await
            .into_iter()
            .map(|r| r.record_id)
            .collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[tokio::test]
    async fn test_doctor_is_replaced_by_latest_response() {
        let registry = RowRegistry::new();
        let pending = Record {
            record_id: "x".to_string(),
            doctor: None,
            record_status: "PENDING".to_string(),
        };
        registry.render("x", &pending).await;
        assert_eq!(registry.get("x").await.unwrap().doctor, None);

        registry
            .render("x", &Record::test_new("x", "Окулист", "Обработка..."))
            .await;
        assert_eq!(
            registry.get("x").await.unwrap().doctor.as_deref(),
            Some("Окулист")
        );
    }

    #[tokio::test]
    async fn test_set_chain_state_requires_existing_row() {
        let registry = RowRegistry::new();
        assert!(!registry.set_chain_state("nope", ChainState::Done).await);

        registry
            .render("a", &Record::test_new("a", "Лор", "FAILURE"))
            .await;
        assert!(registry.set_chain_state("a", ChainState::Done).await);
        assert_eq!(registry.get("a").await.unwrap().chain, ChainState::Done);
    }

    #[tokio::test]
    async fn test_render_html_escapes_cells() {
        let registry = RowRegistry::new();
        registry
            .render("r1", &Record::test_new("r1", "<b>Лор</b>", "PENDING"))
            .await;
        registry
            .render(
                "r2",
                &Record {
                    record_id: "r2".to_string(),
                    doctor: None,
                    record_status: "a&b".to_string(),
                },
            )
            .await;

        let html = registry.render_html().await;
        assert_eq!(
            html,
            "<tr id=\"r1\"><td>r1</td><td>&lt;b&gt;Лор&lt;/b&gt;</td><td>PENDING</td></tr>\n\
             <tr id=\"r2\"><td>r2</td><td></td><td>a&amp;b</td></tr>\n"
        );
    }

    #[test]
    fn test_escape_html_quotes() {
        assert_eq!(escape_html("\"x' y\""), "&quot;x&#39; y&quot;");
        assert_eq!(escape_html("Успешно"), "Успешно");
    }
}
