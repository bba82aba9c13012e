//! Property tests over the full create/open cycle.

use proptest::prelude::*;

use oxshare::store::ShareStore;
use oxshare::{Payload, SecretContent, ShareError, SharePolicy};
use oxshare_testkit::generators::payload;
use oxshare_testkit::{text_payload, PolicyParams, TestFixture};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn matches_payload(content: &SecretContent, payload: &Payload) -> bool {
    match (content, payload) {
        (SecretContent::Text(got), Payload::Text(want)) => got == want,
        (
            SecretContent::File { file_name, data },
            Payload::File { name, data: want },
        ) => file_name == name && data[..] == want[..],
        _ => false,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn opened_content_matches_created(payload in payload(), params: PolicyParams) {
        let fx = TestFixture::new();
        let opened = runtime().block_on(async {
            let created = fx
                .manager
                .create(payload.clone(), params.to_policy())
                .await
                .unwrap();
            fx.manager
                .open_link(&created.link, params.password.as_deref())
                .await
                .unwrap()
        });

        prop_assert!(matches_payload(&opened.content, &payload));
        prop_assert_eq!(opened.view_count, 1);
        let final_view = params.burn_after_read || params.max_views == Some(1);
        prop_assert_eq!(opened.destroyed, final_view);
    }

    #[test]
    fn view_limit_is_exact(max_views in 1u32..=6, extra in 1usize..4) {
        let fx = TestFixture::new();
        let results = runtime().block_on(async {
            let created = fx
                .manager
                .create(Payload::text("counted"), SharePolicy::new().max_views(max_views))
                .await
                .unwrap();

            let mut results = Vec::new();
            for _ in 0..(max_views as usize + extra) {
                results.push(fx.manager.open_link(&created.link, None).await);
            }
            results
        });

        let successes = results.iter().filter(|r| r.is_ok()).count();
        prop_assert_eq!(successes, max_views as usize);
        for (i, result) in results.iter().enumerate() {
            match result {
                Ok(opened) => {
                    prop_assert_eq!(opened.view_count, i as u32 + 1);
                    prop_assert_eq!(opened.destroyed, i as u32 + 1 == max_views);
                }
                Err(e) => prop_assert!(e.is_unavailable()),
            }
        }
        prop_assert_eq!(runtime().block_on(fx.row_count()), 0);
    }

    #[test]
    fn wrong_password_never_counts(text in text_payload(), attempts in 1usize..5) {
        let fx = TestFixture::new();
        let (view_count, opened) = runtime().block_on(async {
            let created = fx
                .manager
                .create(Payload::text(text.clone()), SharePolicy::new().password("right").max_views(1))
                .await
                .unwrap();

            for _ in 0..attempts {
                let err = fx.manager.open_link(&created.link, Some("wrong")).await.unwrap_err();
                assert!(matches!(err, ShareError::IncorrectPassword));
            }
            let view_count = fx.shares.inner().get(&created.id).await.unwrap().unwrap().view_count;
            let opened = fx.manager.open_link(&created.link, Some("right")).await.unwrap();
            (view_count, opened)
        });

        prop_assert_eq!(view_count, 0);
        prop_assert_eq!(opened.content.as_text(), Some(text.as_str()));
        prop_assert!(opened.destroyed);
    }
}
