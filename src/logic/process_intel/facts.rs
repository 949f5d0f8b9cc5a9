//! Process Fact Base - Kiến thức tĩnh về các executables đã biết
//!
//! Mục đích: Cung cấp description / publisher / default tier / kill impact
//! cho các process quen thuộc. Pure data, load một lần, immutable lúc runtime.
//!
//! Resolver và Classifier đều tra cứu ở đây trước khi suy luận từ live signals.

use std::collections::HashMap;
use once_cell::sync::Lazy;

use crate::logic::safety::types::SafetyTier;
use crate::logic::safety::types::SafetyTier::{Caution, Critical, Safe};

// ============================================================================
// FACT TYPE
// ============================================================================

/// Một entry trong fact base (compile-time only)
#[derive(Debug, Clone, Copy)]
pub struct ProcessFact {
    pub name: &'static str,
    pub description: &'static str,
    pub publisher: &'static str,
    pub tier: SafetyTier,
    pub kill_impact: &'static str,
    /// Generic host binary whose real role comes from its command line or
    /// parent (svchost, browsers, interpreters). The resolver must not treat
    /// the canonical description as exact for these.
    pub multi_role: bool,
}

const fn fact(
    name: &'static str,
    description: &'static str,
    publisher: &'static str,
    tier: SafetyTier,
    kill_impact: &'static str,
) -> ProcessFact {
    ProcessFact { name, description, publisher, tier, kill_impact, multi_role: false }
}

const fn host(
    name: &'static str,
    description: &'static str,
    publisher: &'static str,
    tier: SafetyTier,
    kill_impact: &'static str,
) -> ProcessFact {
    ProcessFact { name, description, publisher, tier, kill_impact, multi_role: true }
}

// ============================================================================
// FACT TABLE
// ============================================================================

/// Danh sách executables đã biết. Names are matched case-insensitively.
pub const FACTS: &[ProcessFact] = &[
    // --- Windows core (terminating these takes the session down) ---
    fact("system", "Windows kernel system process", "Microsoft Windows", Critical, "Crashes the operating system immediately"),
    fact("registry", "Windows registry backing process", "Microsoft Windows", Critical, "Crashes the operating system immediately"),
    fact("memory compression", "Compressed memory store", "Microsoft Windows", Critical, "Destabilizes memory management"),
    fact("ntoskrnl.exe", "Windows NT kernel image", "Microsoft Windows", Critical, "Crashes the operating system immediately"),
    fact("smss.exe", "Session Manager Subsystem", "Microsoft Windows", Critical, "Crashes the operating system immediately"),
    fact("csrss.exe", "Client/Server Runtime Subsystem", "Microsoft Windows", Critical, "Blue screen — Windows terminates itself"),
    fact("wininit.exe", "Windows Startup Application", "Microsoft Windows", Critical, "Blue screen — Windows terminates itself"),
    fact("winlogon.exe", "Windows Logon Application", "Microsoft Windows", Critical, "Ends the interactive session"),
    fact("services.exe", "Service Control Manager", "Microsoft Windows", Critical, "All Windows services stop; forced reboot"),
    fact("lsass.exe", "Local Security Authority Process", "Microsoft Windows", Critical, "Forced reboot within one minute"),
    fact("lsaiso.exe", "Credential Guard isolated LSA", "Microsoft Windows", Critical, "Breaks credential isolation; forced reboot"),
    fact("dwm.exe", "Desktop Window Manager", "Microsoft Windows", Critical, "Screen goes black until the compositor restarts"),
    fact("fontdrvhost.exe", "Usermode Font Driver Host", "Microsoft Windows", Critical, "Text rendering fails across the session"),
    fact("trustedinstaller.exe", "Windows Modules Installer", "Microsoft Windows", Critical, "Interrupts Windows Update; can corrupt an install"),

    // --- Service hosts & session plumbing ---
    host("svchost.exe", "Service Host (hosts Windows services)", "Microsoft Windows", Caution, "Every service in this instance stops"),
    fact("explorer.exe", "Windows Explorer (desktop and taskbar)", "Microsoft Windows", Caution, "Desktop, taskbar, and open folders close until restarted"),
    fact("sihost.exe", "Shell Infrastructure Host", "Microsoft Windows", Caution, "Start menu and action center stop working"),
    fact("taskhostw.exe", "Host Process for Windows Tasks", "Microsoft Windows", Caution, "Background tasks hosted here are interrupted"),
    fact("ctfmon.exe", "CTF Loader (text input services)", "Microsoft Windows", Caution, "Keyboard layouts and IME input may stop working"),
    fact("audiodg.exe", "Windows Audio Device Graph Isolation", "Microsoft Windows", Caution, "All audio stops until the service recovers"),
    fact("spoolsv.exe", "Print Spooler Service", "Microsoft Windows", Caution, "Printing stops for all applications"),
    fact("searchindexer.exe", "Windows Search Indexer", "Microsoft Windows", Caution, "File search results become stale"),
    fact("wudfhost.exe", "Windows User-Mode Driver Framework Host", "Microsoft Windows", Caution, "Devices using user-mode drivers may disconnect"),
    fact("wlanext.exe", "Windows Wireless LAN Extensibility", "Microsoft Windows", Caution, "Wi-Fi connectivity may drop"),
    fact("wmiprvse.exe", "WMI Provider Host", "Microsoft Windows", Caution, "Management queries fail until it restarts"),
    fact("tiworker.exe", "Windows Modules Installer Worker", "Microsoft Windows", Caution, "Interrupts an in-progress update"),
    fact("applicationframehost.exe", "Application Frame Host (UWP windows)", "Microsoft Windows", Caution, "All Store-app windows close"),
    fact("smartscreen.exe", "Windows Defender SmartScreen", "Microsoft Windows", Caution, "Download and app reputation checks stop"),
    fact("sgrmbroker.exe", "System Guard Runtime Monitor Broker", "Microsoft Windows", Caution, "Runtime integrity monitoring stops"),
    fact("dashost.exe", "Device Association Framework Host", "Microsoft Windows", Safe, "Device pairing in progress is interrupted"),
    host("runtimebroker.exe", "Runtime Broker (Store app permissions)", "Microsoft Windows", Safe, "Restarts automatically on demand"),
    host("dllhost.exe", "COM Surrogate", "Microsoft Windows", Safe, "The hosted COM component dies; caller may error"),
    host("conhost.exe", "Console Window Host", "Microsoft Windows", Safe, "The attached console application loses its window"),
    fact("shellexperiencehost.exe", "Windows Shell Experience Host", "Microsoft Windows", Safe, "Restarts automatically"),
    fact("startmenuexperiencehost.exe", "Start Menu Experience Host", "Microsoft Windows", Safe, "Start menu restarts automatically"),
    fact("searchapp.exe", "Windows Search front-end", "Microsoft Windows", Safe, "Search UI restarts on next use"),
    fact("searchui.exe", "Windows Search front-end (legacy)", "Microsoft Windows", Safe, "Search UI restarts on next use"),
    fact("lockapp.exe", "Windows Lock Screen app", "Microsoft Windows", Safe, "Restarts at next lock"),
    fact("textinputhost.exe", "Windows Text Input host", "Microsoft Windows", Safe, "Touch keyboard restarts on next use"),
    fact("systemsettings.exe", "Windows Settings app", "Microsoft Windows", Safe, "Settings window closes"),
    fact("useroobebroker.exe", "User Out-of-Box-Experience Broker", "Microsoft Windows", Safe, ""),
    host("backgroundtaskhost.exe", "Background Task Host", "Microsoft Windows", Safe, "The hosted background task is cancelled"),
    host("werfault.exe", "Windows Error Reporting", "Microsoft Windows", Safe, "Crash report for another process is discarded"),
    host("werfaultsecure.exe", "Windows Error Reporting (secure)", "Microsoft Windows", Safe, "Crash report for another process is discarded"),
    fact("yourphone.exe", "Phone Link", "Microsoft Corporation", Safe, "Phone notifications disconnect"),
    fact("phoneexperiencehost.exe", "Phone Link host", "Microsoft Corporation", Safe, "Phone notifications disconnect"),
    fact("widgets.exe", "Windows Widgets", "Microsoft Corporation", Safe, ""),
    fact("widgetservice.exe", "Windows Widgets service", "Microsoft Corporation", Safe, ""),
    fact("gamebar.exe", "Xbox Game Bar", "Microsoft Corporation", Safe, ""),
    fact("gamebarftserver.exe", "Xbox Game Bar capture server", "Microsoft Corporation", Safe, "In-progress capture is lost"),
    fact("securityhealthsystray.exe", "Windows Security tray icon", "Microsoft Corporation", Safe, "Tray icon disappears; protection unaffected"),

    // --- Security / Defender ---
    fact("msmpeng.exe", "Microsoft Defender Antivirus engine", "Microsoft Corporation", Caution, "Real-time malware protection stops"),
    fact("mpdefendercoreservice.exe", "Microsoft Defender Core Service", "Microsoft Corporation", Caution, "Defender management stops"),
    fact("nissrv.exe", "Microsoft Defender network inspection", "Microsoft Corporation", Caution, "Network threat inspection stops"),
    fact("securityhealthservice.exe", "Windows Security Health Service", "Microsoft Corporation", Caution, "Security status reporting stops"),
    fact("mpcmdrun.exe", "Microsoft Defender command-line utility", "Microsoft Corporation", Safe, "An in-progress scan is cancelled"),

    // --- Browsers (Chromium family is multi-role: renderer/gpu/utility) ---
    host("chrome.exe", "Google Chrome web browser", "Google LLC", Safe, "Closes browser windows; unsaved form data is lost"),
    host("msedge.exe", "Microsoft Edge web browser", "Microsoft Corporation", Safe, "Closes browser windows; unsaved form data is lost"),
    host("brave.exe", "Brave web browser", "Brave Software, Inc.", Safe, "Closes browser windows; unsaved form data is lost"),
    host("opera.exe", "Opera web browser", "Opera Norway AS", Safe, "Closes browser windows; unsaved form data is lost"),
    host("vivaldi.exe", "Vivaldi web browser", "Vivaldi Technologies AS", Safe, "Closes browser windows; unsaved form data is lost"),
    fact("firefox.exe", "Mozilla Firefox web browser", "Mozilla Corporation", Safe, "Closes browser windows; unsaved form data is lost"),
    fact("iexplore.exe", "Internet Explorer", "Microsoft Corporation", Safe, "Closes browser windows"),
    host("msedgewebview2.exe", "Microsoft Edge WebView2 (embedded browser)", "Microsoft Corporation", Safe, "The app embedding it loses its web content"),
    host("crashpad_handler.exe", "Crashpad crash reporter", "", Safe, "Crash reporting for its parent app stops"),

    // --- Communication ---
    fact("teams.exe", "Microsoft Teams", "Microsoft Corporation", Safe, "Leaves any active meeting"),
    fact("ms-teams.exe", "Microsoft Teams (new)", "Microsoft Corporation", Safe, "Leaves any active meeting"),
    fact("slack.exe", "Slack", "Slack Technologies, Inc.", Safe, "Disconnects from workspaces"),
    fact("discord.exe", "Discord", "Discord Inc.", Safe, "Leaves any active voice channel"),
    fact("zoom.exe", "Zoom", "Zoom Video Communications, Inc.", Safe, "Leaves any active meeting"),
    fact("skype.exe", "Skype", "Microsoft Corporation", Safe, "Ends any active call"),
    fact("telegram.exe", "Telegram Desktop", "Telegram FZ-LLC", Safe, ""),
    fact("whatsapp.exe", "WhatsApp Desktop", "WhatsApp LLC", Safe, ""),
    fact("signal.exe", "Signal Desktop", "Signal Messenger, LLC", Safe, ""),
    fact("outlook.exe", "Microsoft Outlook", "Microsoft Corporation", Safe, "Unsent drafts may be lost"),
    fact("thunderbird.exe", "Mozilla Thunderbird", "Mozilla Corporation", Safe, "Unsent drafts may be lost"),

    // --- Office & documents ---
    fact("winword.exe", "Microsoft Word", "Microsoft Corporation", Safe, "Unsaved documents are lost"),
    fact("excel.exe", "Microsoft Excel", "Microsoft Corporation", Safe, "Unsaved workbooks are lost"),
    fact("powerpnt.exe", "Microsoft PowerPoint", "Microsoft Corporation", Safe, "Unsaved presentations are lost"),
    fact("onenote.exe", "Microsoft OneNote", "Microsoft Corporation", Safe, "Notes pending sync may be lost"),
    fact("msaccess.exe", "Microsoft Access", "Microsoft Corporation", Safe, "Unsaved changes are lost"),
    fact("mspub.exe", "Microsoft Publisher", "Microsoft Corporation", Safe, "Unsaved changes are lost"),
    fact("visio.exe", "Microsoft Visio", "Microsoft Corporation", Safe, "Unsaved diagrams are lost"),
    fact("acrobat.exe", "Adobe Acrobat", "Adobe Inc.", Safe, "Unsaved changes are lost"),
    fact("acrord32.exe", "Adobe Acrobat Reader", "Adobe Inc.", Safe, ""),
    fact("notepad.exe", "Notepad", "Microsoft Windows", Safe, "Unsaved text is lost"),
    fact("notepad++.exe", "Notepad++", "Notepad++ Team", Safe, "Unsaved text is lost"),
    fact("wordpad.exe", "WordPad", "Microsoft Windows", Safe, "Unsaved text is lost"),

    // --- Media ---
    fact("spotify.exe", "Spotify", "Spotify AB", Safe, "Playback stops"),
    fact("vlc.exe", "VLC media player", "VideoLAN", Safe, "Playback stops"),
    fact("wmplayer.exe", "Windows Media Player", "Microsoft Corporation", Safe, "Playback stops"),
    fact("itunes.exe", "iTunes", "Apple Inc.", Safe, "Playback and device sync stop"),
    fact("obs64.exe", "OBS Studio", "OBS Project", Safe, "Any recording or stream in progress ends"),
    fact("audacity.exe", "Audacity", "Audacity Team", Safe, "Unsaved audio edits are lost"),
    fact("mpc-hc64.exe", "Media Player Classic", "MPC-HC Team", Safe, "Playback stops"),

    // --- Gaming ---
    fact("steam.exe", "Steam", "Valve", Safe, "Game downloads pause; running games lose overlay"),
    fact("steamwebhelper.exe", "Steam web helper", "Valve", Safe, "Steam UI goes blank until restarted"),
    fact("steamservice.exe", "Steam client service", "Valve", Caution, "Running Steam games may lose connectivity"),
    fact("epicgameslauncher.exe", "Epic Games Launcher", "Epic Games, Inc.", Safe, "Game downloads pause"),
    fact("origin.exe", "EA Origin", "Electronic Arts", Safe, "Game downloads pause"),
    fact("battle.net.exe", "Battle.net", "Blizzard Entertainment", Safe, "Game downloads pause"),
    fact("riotclientservices.exe", "Riot Client", "Riot Games, Inc.", Safe, "Riot games lose their client connection"),
    fact("galaxyclient.exe", "GOG Galaxy", "GOG sp. z o.o.", Safe, ""),
    fact("gamingservices.exe", "Microsoft Gaming Services", "Microsoft Corporation", Caution, "Xbox app and Game Pass titles stop launching"),

    // --- Developer tools ---
    host("code.exe", "Visual Studio Code", "Microsoft Corporation", Safe, "Unsaved edits are lost"),
    fact("cursor.exe", "Cursor editor", "Anysphere, Inc.", Safe, "Unsaved edits are lost"),
    fact("devenv.exe", "Microsoft Visual Studio", "Microsoft Corporation", Safe, "Unsaved edits are lost; debug sessions end"),
    fact("idea64.exe", "IntelliJ IDEA", "JetBrains s.r.o.", Safe, "Unsaved edits are lost"),
    fact("pycharm64.exe", "PyCharm", "JetBrains s.r.o.", Safe, "Unsaved edits are lost"),
    fact("webstorm64.exe", "WebStorm", "JetBrains s.r.o.", Safe, "Unsaved edits are lost"),
    fact("rider64.exe", "JetBrains Rider", "JetBrains s.r.o.", Safe, "Unsaved edits are lost"),
    fact("clion64.exe", "CLion", "JetBrains s.r.o.", Safe, "Unsaved edits are lost"),
    fact("sublime_text.exe", "Sublime Text", "Sublime HQ Pty Ltd", Safe, "Unsaved edits are lost"),
    fact("windowsterminal.exe", "Windows Terminal", "Microsoft Corporation", Safe, "All terminal tabs close"),
    host("cmd.exe", "Command Prompt", "Microsoft Windows", Safe, "The running command is interrupted"),
    host("powershell.exe", "Windows PowerShell", "Microsoft Windows", Safe, "The running script is interrupted"),
    host("pwsh.exe", "PowerShell 7", "Microsoft Corporation", Safe, "The running script is interrupted"),
    fact("bash.exe", "Bash on Windows", "Microsoft Corporation", Safe, "The running shell session ends"),
    fact("wsl.exe", "Windows Subsystem for Linux launcher", "Microsoft Corporation", Safe, "The WSL session ends"),
    fact("wslhost.exe", "WSL background host", "Microsoft Corporation", Safe, "WSL interop for a session ends"),
    fact("vmmem", "Virtual machine host memory (WSL2/Hyper-V)", "Microsoft Corporation", Caution, "Running VMs and WSL2 distros stop"),
    host("python.exe", "Python interpreter", "Python Software Foundation", Safe, "The running script is terminated"),
    host("pythonw.exe", "Python interpreter (windowless)", "Python Software Foundation", Safe, "The running script is terminated"),
    host("node.exe", "Node.js JavaScript runtime", "Node.js Foundation", Safe, "The running script or server is terminated"),
    host("java.exe", "Java Runtime", "Oracle Corporation", Safe, "The running Java application is terminated"),
    host("javaw.exe", "Java Runtime (windowless)", "Oracle Corporation", Safe, "The running Java application is terminated"),
    fact("git.exe", "Git version control", "The Git Development Community", Safe, "An in-progress git operation is interrupted"),
    fact("cargo.exe", "Rust package manager", "The Rust Project Developers", Safe, "The running build is interrupted"),
    fact("rustc.exe", "Rust compiler", "The Rust Project Developers", Safe, "The running compilation is interrupted"),
    fact("docker desktop.exe", "Docker Desktop", "Docker Inc.", Safe, "Container management UI closes"),
    fact("com.docker.backend.exe", "Docker Desktop backend", "Docker Inc.", Caution, "All running containers stop"),
    fact("dockerd.exe", "Docker daemon", "Docker Inc.", Caution, "All running containers stop"),
    fact("postman.exe", "Postman", "Postman, Inc.", Safe, ""),

    // --- Local servers & databases ---
    fact("mysqld.exe", "MySQL database server", "Oracle Corporation", Caution, "Connected applications lose their database"),
    fact("postgres.exe", "PostgreSQL database server", "PostgreSQL Global Development Group", Caution, "Connected applications lose their database"),
    fact("sqlservr.exe", "Microsoft SQL Server", "Microsoft Corporation", Caution, "Connected applications lose their database"),
    fact("redis-server.exe", "Redis server", "Redis Ltd.", Caution, "Connected applications lose their cache"),
    fact("nginx.exe", "nginx web server", "Nginx, Inc.", Caution, "Sites served by this instance go down"),
    fact("httpd.exe", "Apache HTTP Server", "Apache Software Foundation", Caution, "Sites served by this instance go down"),

    // --- Cloud sync ---
    fact("onedrive.exe", "Microsoft OneDrive", "Microsoft Corporation", Safe, "File sync pauses"),
    fact("dropbox.exe", "Dropbox", "Dropbox, Inc.", Safe, "File sync pauses"),
    fact("googledrivefs.exe", "Google Drive for desktop", "Google LLC", Safe, "File sync pauses; drive letter disappears"),
    fact("icloudservices.exe", "iCloud services", "Apple Inc.", Safe, "iCloud sync pauses"),
    fact("megasync.exe", "MEGA sync client", "Mega Limited", Safe, "File sync pauses"),

    // --- Updaters & vendor background agents ---
    fact("googleupdate.exe", "Google Update", "Google LLC", Safe, "Deferred until next scheduled run"),
    fact("microsoftedgeupdate.exe", "Microsoft Edge Update", "Microsoft Corporation", Safe, "Deferred until next scheduled run"),
    fact("adobearm.exe", "Adobe Acrobat Update Service", "Adobe Inc.", Safe, "Deferred until next scheduled run"),
    fact("jusched.exe", "Java Update Scheduler", "Oracle Corporation", Safe, ""),
    fact("creative cloud.exe", "Adobe Creative Cloud", "Adobe Inc.", Safe, "Creative Cloud apps lose license checks"),
    fact("adobeipcbroker.exe", "Adobe IPC Broker", "Adobe Inc.", Safe, ""),
    fact("nvcontainer.exe", "NVIDIA Container", "NVIDIA Corporation", Caution, "GPU helper features (overlay, capture) stop"),
    fact("nvdisplay.container.exe", "NVIDIA Display Container", "NVIDIA Corporation", Caution, "Display control panel features stop"),
    fact("igfxem.exe", "Intel Graphics Executable Main Module", "Intel Corporation", Caution, "Display hotkeys and settings stop"),
    fact("rtkauduservice64.exe", "Realtek Audio Universal Service", "Realtek Semiconductor Corp.", Caution, "Audio enhancements stop"),
    fact("syntpenh.exe", "Synaptics TouchPad enhancements", "Synaptics Incorporated", Caution, "Touchpad gestures stop"),
    fact("logioptionsplus_agent.exe", "Logitech Options+ agent", "Logitech, Inc.", Safe, "Device button customizations stop"),

    // --- Utilities ---
    fact("taskmgr.exe", "Task Manager", "Microsoft Windows", Safe, ""),
    fact("regedit.exe", "Registry Editor", "Microsoft Windows", Safe, "Unapplied edits are lost"),
    fact("mmc.exe", "Microsoft Management Console", "Microsoft Windows", Safe, "Open snap-ins close"),
    fact("control.exe", "Control Panel", "Microsoft Windows", Safe, ""),
    fact("calc.exe", "Calculator", "Microsoft Windows", Safe, ""),
    fact("mspaint.exe", "Paint", "Microsoft Windows", Safe, "Unsaved images are lost"),
    fact("snippingtool.exe", "Snipping Tool", "Microsoft Windows", Safe, "Unsaved captures are lost"),
    fact("winrar.exe", "WinRAR", "win.rar GmbH", Safe, "An in-progress archive operation is interrupted"),
    fact("7zfm.exe", "7-Zip File Manager", "Igor Pavlov", Safe, ""),
    fact("7zg.exe", "7-Zip GUI helper", "Igor Pavlov", Safe, "An in-progress archive operation is interrupted"),
    fact("everything.exe", "Everything file search", "voidtools", Safe, "Instant file search stops"),
    fact("putty.exe", "PuTTY SSH client", "Simon Tatham", Safe, "The SSH session disconnects"),
    fact("filezilla.exe", "FileZilla FTP client", "Tim Kosse", Safe, "Transfers in progress are interrupted"),
    fact("mstsc.exe", "Remote Desktop Connection", "Microsoft Windows", Safe, "The remote session disconnects"),
    fact("teamviewer.exe", "TeamViewer", "TeamViewer Germany GmbH", Caution, "Remote-control sessions disconnect"),
    fact("anydesk.exe", "AnyDesk", "AnyDesk Software GmbH", Caution, "Remote-control sessions disconnect"),
    fact("quickassist.exe", "Microsoft Quick Assist", "Microsoft Corporation", Caution, "Remote-assistance sessions disconnect"),

    // --- System tools often driven by other processes ---
    host("rundll32.exe", "Windows host process for DLL functions", "Microsoft Windows", Caution, "The hosted DLL function is interrupted"),
    host("msiexec.exe", "Windows Installer", "Microsoft Windows", Caution, "An install or uninstall in progress is interrupted"),
    fact("wscript.exe", "Windows Script Host", "Microsoft Windows", Caution, "The running script is terminated"),
    fact("cscript.exe", "Windows Script Host (console)", "Microsoft Windows", Caution, "The running script is terminated"),
    fact("mshta.exe", "Microsoft HTML Application Host", "Microsoft Windows", Caution, "The running HTML application is terminated"),
    fact("regsvr32.exe", "Microsoft Register Server", "Microsoft Windows", Caution, "Component registration is interrupted"),
    fact("schtasks.exe", "Task Scheduler command-line tool", "Microsoft Windows", Safe, ""),
    fact("sc.exe", "Service Control command-line tool", "Microsoft Windows", Safe, ""),
    fact("taskkill.exe", "Task Kill utility", "Microsoft Windows", Safe, ""),
    fact("wmic.exe", "WMI command-line utility", "Microsoft Windows", Caution, "The management query is interrupted"),
    fact("certutil.exe", "Certificate Services utility", "Microsoft Windows", Caution, "The certificate operation is interrupted"),
    fact("bitsadmin.exe", "BITS administration utility", "Microsoft Windows", Caution, ""),
    fact("msbuild.exe", "Microsoft Build Engine", "Microsoft Corporation", Safe, "The running build is interrupted"),
    fact("dism.exe", "Deployment Image Servicing and Management", "Microsoft Windows", Caution, "Interrupting servicing can corrupt the image"),
    fact("sfc.exe", "System File Checker", "Microsoft Windows", Caution, "The integrity scan is interrupted"),
    fact("cleanmgr.exe", "Disk Cleanup", "Microsoft Windows", Safe, ""),
    fact("defrag.exe", "Drive Optimizer", "Microsoft Windows", Caution, "Optimization in progress is interrupted"),
    fact("diskpart.exe", "Disk Partition utility", "Microsoft Windows", Caution, "Interrupting a partition operation risks data loss"),
    fact("wuauclt.exe", "Windows Update client (legacy)", "Microsoft Windows", Safe, ""),
    fact("usoclient.exe", "Update Session Orchestrator client", "Microsoft Windows", Safe, ""),
];

// ============================================================================
// SVCHOST SERVICE DESCRIPTIONS
// ============================================================================

/// Friendly descriptions for services commonly hosted by svchost.exe.
/// Matched case-insensitively on the short service name.
pub const SERVICE_DESCRIPTIONS: &[(&str, &str)] = &[
    ("rpcss", "Remote Procedure Call — core inter-process communication"),
    ("dcomlaunch", "DCOM Server Process Launcher — starts COM servers"),
    ("plugplay", "Plug and Play — device detection"),
    ("power", "Power management"),
    ("brokerinfrastructure", "Background broker infrastructure"),
    ("schedule", "Task Scheduler"),
    ("eventlog", "Windows Event Log"),
    ("profsvc", "User Profile Service"),
    ("usermanager", "User Manager — multi-user session state"),
    ("gpsvc", "Group Policy Client"),
    ("winmgmt", "Windows Management Instrumentation"),
    ("cryptsvc", "Cryptographic Services"),
    ("sens", "System Event Notification Service"),
    ("dnscache", "DNS Client — name resolution cache"),
    ("dhcp", "DHCP Client — network address assignment"),
    ("nlasvc", "Network Location Awareness"),
    ("netprofm", "Network List Service"),
    ("wlansvc", "WLAN AutoConfig — Wi-Fi management"),
    ("lanmanserver", "Server — file and printer sharing"),
    ("lanmanworkstation", "Workstation — SMB client connections"),
    ("wuauserv", "Windows Update"),
    ("bits", "Background Intelligent Transfer Service — downloads"),
    ("windefend", "Microsoft Defender Antivirus Service"),
    ("wdnissvc", "Microsoft Defender Network Inspection Service"),
    ("wscsvc", "Security Center — status reporting"),
    ("spooler", "Print Spooler"),
    ("audiosrv", "Windows Audio"),
    ("audioendpointbuilder", "Windows Audio Endpoint Builder"),
    ("themes", "Themes — visual styles"),
    ("sysmain", "SysMain — memory prefetch (Superfetch)"),
    ("diagtrack", "Connected User Experiences and Telemetry"),
    ("w32time", "Windows Time — clock synchronization"),
    ("staterepository", "State Repository — app deployment state"),
    ("coremessagingregistrar", "CoreMessaging — inter-component messaging"),
    ("dps", "Diagnostic Policy Service"),
    ("tokenbroker", "Web Account Manager token broker"),
    ("timebrokersvc", "Time Broker — background task scheduling"),
];

// ============================================================================
// FRIENDLY PARENT NAMES
// ============================================================================

/// Map well-known parent executables to short friendly app names,
/// used when describing helper children ("Console window for VS Code").
pub const PARENT_APP_NAMES: &[(&str, &str)] = &[
    ("chrome.exe", "Google Chrome"),
    ("msedge.exe", "Microsoft Edge"),
    ("firefox.exe", "Firefox"),
    ("brave.exe", "Brave Browser"),
    ("opera.exe", "Opera"),
    ("code.exe", "VS Code"),
    ("cursor.exe", "Cursor Editor"),
    ("teams.exe", "Microsoft Teams"),
    ("ms-teams.exe", "Microsoft Teams"),
    ("slack.exe", "Slack"),
    ("discord.exe", "Discord"),
    ("spotify.exe", "Spotify"),
    ("steam.exe", "Steam"),
    ("explorer.exe", "Windows Explorer"),
    ("devenv.exe", "Visual Studio"),
    ("outlook.exe", "Outlook"),
    ("cmd.exe", "Command Prompt"),
    ("powershell.exe", "PowerShell"),
    ("pwsh.exe", "PowerShell 7"),
    ("windowsterminal.exe", "Windows Terminal"),
    ("python.exe", "Python"),
    ("node.exe", "Node.js"),
    ("java.exe", "Java"),
    ("javaw.exe", "Java"),
    ("rider64.exe", "JetBrains Rider"),
    ("idea64.exe", "IntelliJ IDEA"),
    ("pycharm64.exe", "PyCharm"),
    ("webstorm64.exe", "WebStorm"),
    ("sublime_text.exe", "Sublime Text"),
    ("obs64.exe", "OBS Studio"),
    ("zoom.exe", "Zoom"),
    ("docker desktop.exe", "Docker Desktop"),
];

// ============================================================================
// LOOKUP INDEXES
// ============================================================================

static FACT_INDEX: Lazy<HashMap<&'static str, &'static ProcessFact>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(FACTS.len());
    for fact in FACTS {
        map.insert(fact.name, fact);
    }
    map
});

static SERVICE_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| SERVICE_DESCRIPTIONS.iter().copied().collect());

static PARENT_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| PARENT_APP_NAMES.iter().copied().collect());

// ============================================================================
// PUBLIC API
// ============================================================================

/// Tra cứu fact theo tên executable (case-insensitive)
pub fn lookup(name: &str) -> Option<&'static ProcessFact> {
    FACT_INDEX.get(name.to_lowercase().as_str()).copied()
}

/// Description thân thiện cho một service được host bởi svchost
pub fn service_description(service_name: &str) -> String {
    match SERVICE_INDEX.get(service_name.to_lowercase().as_str()) {
        Some(desc) => (*desc).to_string(),
        None => format!("Windows Service: {}", service_name),
    }
}

/// Tên app thân thiện cho một parent process (fallback: tên gốc)
pub fn parent_app_name(parent_name: &str) -> String {
    PARENT_INDEX
        .get(parent_name.to_lowercase().as_str())
        .map(|s| (*s).to_string())
        .unwrap_or_else(|| parent_name.to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_case_insensitive() {
        let fact = lookup("CHROME.EXE").expect("chrome should be known");
        assert_eq!(fact.publisher, "Google LLC");
        assert!(fact.multi_role);
    }

    #[test]
    fn test_critical_entries_present() {
        for name in ["lsass.exe", "csrss.exe", "services.exe", "smss.exe"] {
            let fact = lookup(name).expect("core process should be known");
            assert_eq!(fact.tier, SafetyTier::Critical, "{} must be Critical", name);
        }
    }

    #[test]
    fn test_fact_base_size() {
        assert!(FACTS.len() >= 150, "fact base holds {} entries", FACTS.len());
    }

    #[test]
    fn test_no_duplicate_names() {
        let mut seen = std::collections::HashSet::new();
        for fact in FACTS {
            assert!(seen.insert(fact.name), "duplicate fact entry: {}", fact.name);
        }
    }

    #[test]
    fn test_service_description_fallback() {
        assert_eq!(service_description("Schedule"), "Task Scheduler");
        assert_eq!(service_description("XyzSvc"), "Windows Service: XyzSvc");
    }
}
