//! Device persona for the stealth browser session.
//!
//! Sites distinguish automation from real traffic by fingerprinting: user
//! agent, screen geometry, hardware counts, plugin lists, the
//! `navigator.webdriver` flag. This module pins a single consistent
//! persona, a developer's MacBook Pro, and produces the launch arguments
//! and the init script that keep every observable surface telling the same
//! story. Only the Chrome patch version and the geolocation jitter vary
//! between sessions.

use rand::Rng;

const CHROME_MAJOR_VERSION: u32 = 121;

/// Boston, with per-session jitter applied on top.
const BASE_LATITUDE: f64 = 42.3601;
const BASE_LONGITUDE: f64 = -71.0589;

/// A concrete, internally consistent device identity.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub user_agent: String,
    pub chrome_version: String,
    pub platform: &'static str,
    pub vendor: &'static str,
    pub gpu: &'static str,
    pub screen_width: u32,
    pub screen_height: u32,
    pub scale_factor: f64,
    pub hardware_concurrency: u32,
    pub device_memory: u32,
    pub languages: [&'static str; 2],
    pub timezone: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

impl DeviceProfile {
    /// The default persona: M1 Pro MacBook, retina display, dark mode
    /// developer. Patch version and location jitter are randomized so two
    /// sessions do not share an exact fingerprint.
    pub fn macbook_pro() -> Self {
        let mut rng = rand::thread_rng();
        let chrome_version = format!(
            "{}.{}.{}.{}",
            CHROME_MAJOR_VERSION,
            rng.gen_range(0..10),
            rng.gen_range(0..10),
            rng.gen_range(0..10),
        );
        let user_agent = format!(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/{} Safari/537.36",
            chrome_version
        );

        Self {
            user_agent,
            chrome_version,
            platform: "MacIntel",
            vendor: "Google Inc. (Apple)",
            gpu: "ANGLE (Apple, Apple M1 Pro, OpenGL 4.1)",
            screen_width: 2560,
            screen_height: 1600,
            scale_factor: 2.0,
            hardware_concurrency: 10,
            device_memory: 32,
            languages: ["en-US", "en"],
            timezone: "America/New_York",
            latitude: BASE_LATITUDE + rng.gen_range(-0.01..0.01),
            longitude: BASE_LONGITUDE + rng.gen_range(-0.01..0.01),
        }
    }

    /// Chromium launch arguments for this persona.
    pub fn launch_args(&self) -> Vec<String> {
        vec![
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-automation".to_string(),
            "--disable-infobars".to_string(),
            "--no-sandbox".to_string(),
            "--disable-setuid-sandbox".to_string(),
            "--ignore-certificate-errors".to_string(),
            format!("--user-agent={}", self.user_agent),
            format!("--window-size={},{}", self.screen_width, self.screen_height),
            format!("--lang={}", self.languages[0]),
            "--force-color-profile=srgb".to_string(),
            "--enable-font-antialiasing".to_string(),
            "--password-store=basic".to_string(),
            "--disable-features=IsolateOrigins".to_string(),
            "--enable-gpu-rasterization".to_string(),
            "--ignore-gpu-blocklist".to_string(),
        ]
    }

    /// Script injected before any page script runs. Overrides the
    /// navigator surfaces automation frameworks leak through and installs
    /// a plausible `window.chrome` runtime.
    pub fn stealth_script(&self) -> String {
        let languages = serde_json::to_string(&self.languages).unwrap_or_default();
        format!(
            r#"
(() => {{
    const generateRandomId = () => {{
        const hex = '0123456789abcdef';
        let id = '';
        for (let i = 0; i < 32; i++) {{
            id += hex[Math.floor(Math.random() * 16)];
            if ([8, 12, 16, 20].includes(i)) id += '-';
        }}
        return id;
    }};

    Object.defineProperties(navigator, {{
        webdriver: {{ get: () => undefined }},
        languages: {{ get: () => {languages} }},
        hardwareConcurrency: {{ get: () => {concurrency} }},
        deviceMemory: {{ get: () => {memory} }},
        platform: {{ get: () => '{platform}' }},
        vendor: {{ get: () => '{vendor}' }},
        plugins: {{ get: () => [
            {{ description: 'Chrome Extension', filename: 'fmkadmapgofadopljbjfkapdkoienihi', name: 'React Developer Tools' }},
            {{ description: 'Chrome Extension', filename: 'lmhkpmbekcpmknklioeibfkpmmfibljd', name: 'Redux DevTools' }},
            {{ description: 'Chrome Extension', filename: 'bcjindcccaagfpapjjmafapmmgkkhgoa', name: 'JSON Formatter' }}
        ] }},
        connection: {{ get: () => ({{
            effectiveType: '4g', rtt: 50, downlink: 10, saveData: false
        }}) }}
    }});

    window.chrome = {{
        runtime: {{
            id: generateRandomId(),
            getManifest: () => ({{ manifest_version: 3 }}),
            connect: () => ({{
                onMessage: {{ addListener: () => {{}} }},
                postMessage: () => {{}}
            }})
        }},
        app: {{ isInstalled: false }},
        csi: () => ({{ startE: Date.now(), onloadT: Date.now() + 100 }}),
        loadTimes: () => ({{
            firstPaintTime: Date.now(),
            wasNpnNegotiated: true,
            connectionInfo: 'h2'
        }})
    }};

    const getParameter = WebGLRenderingContext.prototype.getParameter;
    WebGLRenderingContext.prototype.getParameter = function(parameter) {{
        if (parameter === 37445) return '{gpu}';
        if (parameter === 37446) return '{vendor}';
        return getParameter.apply(this, arguments);
    }};
}})();
"#,
            languages = languages,
            concurrency = self.hardware_concurrency,
            memory = self.device_memory,
            platform = self.platform,
            vendor = self.vendor,
            gpu = self.gpu,
        )
    }
}
