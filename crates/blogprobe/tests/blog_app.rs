//! Full blog suite against the simulated application, with and without
//! interception of the blog API.

mod common;

use blogprobe::scenarios::{blog_app_suite, deletable_blog, CREATED_TITLE};
use blogprobe::{
    actions, expect, BackendClient, HarnessConfig, HttpMethod, Locator, NewBlog, ProbeError,
    ScenarioSetup, ScenarioState, SetupStep, SuiteRunner, User,
};
use common::{backend_server, BlogApp, FakeBackend, SharedBackend};
use std::time::Duration;

fn config() -> HarnessConfig {
    HarnessConfig::default()
        .with_timeout_ms(500)
        .with_poll_interval_ms(5)
}

fn client(server: &mockito::ServerGuard) -> BackendClient {
    BackendClient::new(&server.url(), Duration::from_secs(5))
}

fn runner(
    backend: &SharedBackend,
    server: &mockito::ServerGuard,
    intercept: bool,
) -> SuiteRunner<BlogApp, impl Fn() -> Result<BlogApp, ProbeError> + Send + Sync> {
    let state = backend.clone();
    SuiteRunner::new(
        move || Ok(BlogApp::new(state.clone())),
        client(server),
        ScenarioSetup::new(config()).with_interception(intercept),
    )
}

mod suite_tests {
    use super::*;

    #[tokio::test]
    async fn test_suite_passes_with_interception() {
        let backend = FakeBackend::shared();
        let server = backend_server(backend.clone()).await;

        let results = runner(&backend, &server, true)
            .run(&blog_app_suite())
            .await;

        assert_eq!(results.total(), 5, "{results:#?}");
        assert!(results.all_passed(), "{:#?}", results.failures());
    }

    #[tokio::test]
    async fn test_suite_passes_against_backend() {
        let backend = FakeBackend::shared();
        let server = backend_server(backend.clone()).await;

        let results = runner(&backend, &server, false)
            .run(&blog_app_suite())
            .await;

        assert!(results.all_passed(), "{:#?}", results.failures());
        // The deletion case reset the backend, seeded one blog and removed it.
        assert!(backend.lock().unwrap().blogs().is_empty());
    }

    #[tokio::test]
    async fn test_filter_selects_nested_group() {
        let backend = FakeBackend::shared();
        let server = backend_server(backend.clone()).await;

        let results = runner(&backend, &server, true)
            .with_filter("Login >")
            .run(&blog_app_suite())
            .await;

        assert_eq!(results.total(), 2);
        assert!(results
            .get("Blog app > Login > fails with wrong credentials")
            .is_some_and(|r| r.passed));
    }
}

mod interception_tests {
    use super::*;

    #[tokio::test]
    async fn test_created_blog_stays_in_scenario_store() {
        let backend = FakeBackend::shared();
        let server = backend_server(backend.clone()).await;
        let setup = ScenarioSetup::new(config()).with_interception(true);

        let mut ctx = setup
            .run(&client(&server), BlogApp::new(backend.clone()))
            .await
            .unwrap();
        let user = ctx.user().clone();
        actions::login_with(ctx.page_mut(), &user.username, &user.password)
            .await
            .unwrap();
        actions::create_blog(ctx.page_mut(), CREATED_TITLE, "jabs3", "www.x.com", "80")
            .await
            .unwrap();
        expect(ctx.page(), Locator::text(CREATED_TITLE))
            .to_be_visible()
            .await
            .unwrap();

        let stored = ctx.store_snapshot();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].likes, 80);
        assert!(stored[0].is_owned_by(&user));
        assert!(backend.lock().unwrap().blogs().is_empty());

        let router = ctx.router().lock().unwrap();
        assert_eq!(router.requests_by_method(HttpMethod::Post).len(), 1);
        assert_eq!(router.requests_by_method(HttpMethod::Get).len(), 1);
    }

    #[tokio::test]
    async fn test_login_passes_through_to_backend() {
        let backend = FakeBackend::shared();
        let server = backend_server(backend.clone()).await;

        let mut ctx = ScenarioSetup::new(config())
            .with_interception(true)
            .run(&client(&server), BlogApp::new(backend.clone()))
            .await
            .unwrap();
        let user = ctx.user().clone();
        actions::login_with(ctx.page_mut(), &user.username, &user.password)
            .await
            .unwrap();

        expect(ctx.page(), Locator::text(user.logged_in_banner()))
            .to_be_visible()
            .await
            .unwrap();
        assert!(ctx.page().driver().requests.contains(&(HttpMethod::Post, "/api/login".to_string())));
        ctx.transition(ScenarioState::Authenticated).unwrap();
    }

    #[tokio::test]
    async fn test_dismissed_confirmation_keeps_blog() {
        let backend = FakeBackend::shared();
        let server = backend_server(backend.clone()).await;
        let title = deletable_blog().title;

        let mut ctx = ScenarioSetup::new(config())
            .with_interception(true)
            .with_blog(deletable_blog())
            .with_dialog_policy(blogprobe::DialogPolicy::dismiss_all())
            .run(&client(&server), BlogApp::new(backend.clone()))
            .await
            .unwrap();
        let user = ctx.user().clone();
        actions::login_with(ctx.page_mut(), &user.username, &user.password)
            .await
            .unwrap();
        actions::delete_blog(ctx.page_mut(), &title).await.unwrap();

        expect(ctx.page(), Locator::text(title.as_str()))
            .to_be_visible()
            .await
            .unwrap();
        assert_eq!(ctx.store_snapshot().len(), 1);
        assert_eq!(ctx.dialogs().dialog_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_picks_entry_among_several() {
        let backend = FakeBackend::shared();
        let server = backend_server(backend.clone()).await;
        let title = deletable_blog().title;

        let mut ctx = ScenarioSetup::new(config())
            .with_interception(true)
            .with_blog(NewBlog::new(
                "Go To Statement Considered Harmful",
                "Edsger W. Dijkstra",
                "http://x.org",
                "5",
            ))
            .with_blog(deletable_blog())
            .with_blog(NewBlog::new("Second", "Someone Else", "http://y.org", "1"))
            .run(&client(&server), BlogApp::new(backend.clone()))
            .await
            .unwrap();
        let user = ctx.user().clone();
        actions::login_with(ctx.page_mut(), &user.username, &user.password)
            .await
            .unwrap();
        actions::delete_blog(ctx.page_mut(), &title).await.unwrap();

        expect(ctx.page(), Locator::text(title.as_str()))
            .to_be_hidden()
            .await
            .unwrap();
        expect(ctx.page(), Locator::text("Second"))
            .to_be_visible()
            .await
            .unwrap();
        let remaining: Vec<String> = ctx
            .store_snapshot()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(
            remaining,
            vec!["Go To Statement Considered Harmful".to_string(), "Second".to_string()]
        );
    }
}

mod setup_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_user_cannot_log_in() {
        let backend = FakeBackend::shared();
        let server = backend_server(backend.clone()).await;

        let mut ctx = ScenarioSetup::new(config())
            .with_user(User::new("Arto Hellas", "hellas", "secret"))
            .run(&client(&server), BlogApp::new(backend.clone()))
            .await
            .unwrap();
        actions::login_with(ctx.page_mut(), "mluukkai", "salainen")
            .await
            .unwrap();

        expect(ctx.page(), Locator::text(blogprobe::ui::LOGIN_ERROR))
            .to_be_visible()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails_reset() {
        let backend = FakeBackend::shared();
        let unreachable = BackendClient::new("http://127.0.0.1:9", Duration::from_millis(500));

        let err = ScenarioSetup::new(config())
            .run(&unreachable, BlogApp::new(backend))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProbeError::Setup {
                step: SetupStep::Reset,
                ..
            }
        ));
    }
}
